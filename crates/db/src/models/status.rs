//! Status helper enum mapping to the `session_statuses` SMALLINT lookup table.
//!
//! The enum's discriminants match the seed data order (1-based) in the
//! corresponding database table, and the transition table in
//! `careclock_core::lifecycle`.

/// Status ID type matching SMALLINT/SMALLSERIAL in the database.
pub type StatusId = i16;

macro_rules! define_status_enum {
    (
        $(#[$meta:meta])*
        $name:ident {
            $( $(#[$vmeta:meta])* $variant:ident = $val:expr ),+ $(,)?
        }
    ) => {
        $(#[$meta])*
        #[repr(i16)]
        #[derive(Debug, Clone, Copy, PartialEq, Eq)]
        pub enum $name {
            $( $(#[$vmeta])* $variant = $val ),+
        }

        impl $name {
            /// Return the database status ID.
            pub fn id(self) -> StatusId {
                self as StatusId
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
    /// Visit session lifecycle status.
    SessionStatus {
        /// Practitioner is clocked in.
        Active = 1,
        /// Clean clock-out by the practitioner.
        Completed = 2,
        /// Force-ended by the timeout reconciler.
        AutoEnded = 3,
        /// Client reported connectivity loss before a clean clock-out.
        Disconnected = 4,
        /// Terminated via the emergency path.
        EmergencyEnded = 5,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use careclock_core::lifecycle;

    #[test]
    fn session_status_ids_match_seed_data() {
        assert_eq!(SessionStatus::Active.id(), 1);
        assert_eq!(SessionStatus::Completed.id(), 2);
        assert_eq!(SessionStatus::AutoEnded.id(), 3);
        assert_eq!(SessionStatus::Disconnected.id(), 4);
        assert_eq!(SessionStatus::EmergencyEnded.id(), 5);
    }

    #[test]
    fn status_into_status_id() {
        let id: StatusId = SessionStatus::Active.into();
        assert_eq!(id, 1);
    }

    #[test]
    fn ids_agree_with_core_lifecycle() {
        assert_eq!(SessionStatus::Active.id(), lifecycle::STATUS_ACTIVE);
        assert_eq!(SessionStatus::Completed.id(), lifecycle::STATUS_COMPLETED);
        assert_eq!(SessionStatus::AutoEnded.id(), lifecycle::STATUS_AUTO_ENDED);
        assert_eq!(SessionStatus::Disconnected.id(), lifecycle::STATUS_DISCONNECTED);
        assert_eq!(
            SessionStatus::EmergencyEnded.id(),
            lifecycle::STATUS_EMERGENCY_ENDED
        );
    }
}
