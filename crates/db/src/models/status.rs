//! Status helper enums mapping to SMALLSERIAL lookup tables.
//!
//! Each enum variant's discriminant matches the seed data order (1-based)
//! in the corresponding `*_statuses` table, and its name matches the
//! table's `name` column.

use outreach_core::error::CoreError;

/// Status ID type matching SMALLINT/SMALLSERIAL in the database.
pub type StatusId = i16;

macro_rules! define_status_enum {
    (
        $(#[$meta:meta])*
        $name:ident {
            $( $(#[$vmeta:meta])* $variant:ident = $val:literal => $label:literal ),+ $(,)?
        }
    ) => {
        $(#[$meta])*
        #[repr(i16)]
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        pub enum $name {
            $( $(#[$vmeta])* $variant = $val ),+
        }

        impl $name {
            /// Return the database status ID.
            pub fn id(self) -> StatusId {
                self as StatusId
            }

            /// Return the lookup-table name.
            pub fn name(self) -> &'static str {
                match self {
                    $( $name::$variant => $label ),+
                }
            }

            /// Resolve a lookup-table name.
            pub fn from_name(name: &str) -> Result<Self, CoreError> {
                match name {
                    $( $label => Ok($name::$variant), )+
                    other => Err(CoreError::Validation(format!(
                        "Invalid {} '{other}'. Must be one of: {}",
                        stringify!($name),
                        [$( $label ),+].join(", ")
                    ))),
                }
            }

            /// Resolve a database status ID.
            pub fn from_id(id: StatusId) -> Option<Self> {
                match id {
                    $( $val => Some($name::$variant), )+
                    _ => None,
                }
            }
        }

        impl From<$name> for StatusId {
            fn from(value: $name) -> Self {
                value as StatusId
            }
        }
    };
}

define_status_enum! {
    /// Prospect lifecycle status.
    ProspectStatus {
        New = 1 => "new",
        Qualified = 2 => "qualified",
        Contacted = 3 => "contacted",
        Engaged = 4 => "engaged",
        Interested = 5 => "interested",
        Declined = 6 => "declined",
        Enrolled = 7 => "enrolled",
    }
}

define_status_enum! {
    /// Outreach campaign lifecycle status.
    CampaignStatus {
        Draft = 1 => "draft",
        Active = 2 => "active",
        Paused = 3 => "paused",
        Completed = 4 => "completed",
    }
}

define_status_enum! {
    /// Delivery and engagement status of a single message.
    MessageStatus {
        Pending = 1 => "pending",
        Sent = 2 => "sent",
        Delivered = 3 => "delivered",
        Opened = 4 => "opened",
        Clicked = 5 => "clicked",
        Replied = 6 => "replied",
        Bounced = 7 => "bounced",
    }
}

define_status_enum! {
    /// Background job status.
    JobStatus {
        Pending = 1 => "pending",
        Running = 2 => "running",
        Completed = 3 => "completed",
        Failed = 4 => "failed",
        Cancelled = 5 => "cancelled",
    }
}

impl ProspectStatus {
    /// Status a prospect moves to after a classified reply.
    pub fn for_reply(outcome: outreach_core::responses::ReplyOutcome) -> Self {
        use outreach_core::responses::ReplyOutcome;
        match outcome {
            ReplyOutcome::Positive => ProspectStatus::Interested,
            ReplyOutcome::Negative => ProspectStatus::Declined,
            ReplyOutcome::Neutral => ProspectStatus::Engaged,
        }
    }
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;
    use outreach_core::responses::ReplyOutcome;

    use super::*;

    #[test]
    fn ids_match_seed_order() {
        assert_eq!(ProspectStatus::New.id(), 1);
        assert_eq!(ProspectStatus::Enrolled.id(), 7);
        assert_eq!(CampaignStatus::Paused.id(), 3);
        assert_eq!(MessageStatus::Bounced.id(), 7);
        assert_eq!(JobStatus::Cancelled.id(), 5);
    }

    #[test]
    fn names_round_trip() {
        assert_eq!(ProspectStatus::from_name("qualified").unwrap(), ProspectStatus::Qualified);
        assert_eq!(CampaignStatus::Active.name(), "active");
        assert_eq!(MessageStatus::from_id(6), Some(MessageStatus::Replied));
        assert_eq!(JobStatus::from_id(99), None);
    }

    #[test]
    fn unknown_name_is_validation_error() {
        assert_matches!(ProspectStatus::from_name("vip"), Err(CoreError::Validation(_)));
    }

    #[test]
    fn reply_outcomes_map_to_prospect_statuses() {
        assert_eq!(ProspectStatus::for_reply(ReplyOutcome::Positive), ProspectStatus::Interested);
        assert_eq!(ProspectStatus::for_reply(ReplyOutcome::Negative), ProspectStatus::Declined);
        assert_eq!(ProspectStatus::for_reply(ReplyOutcome::Neutral), ProspectStatus::Engaged);
    }
}
