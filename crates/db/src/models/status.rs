//! Status enums mapping to SMALLINT lookup tables.
//!
//! Each variant's discriminant matches the seed order (1-based) of the
//! corresponding `*_statuses` table, and its name matches the seeded
//! `name` column.

/// Status ID type matching SMALLINT in the database.
pub type StatusId = i16;

macro_rules! define_status_enum {
    (
        $(#[$meta:meta])*
        $name:ident {
            $( $(#[$vmeta:meta])* $variant:ident = $val:expr => $label:literal ),+ $(,)?
        }
    ) => {
        $(#[$meta])*
        #[repr(i16)]
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        pub enum $name {
            $( $(#[$vmeta])* $variant = $val ),+
        }

        impl $name {
            pub const ALL: &'static [$name] = &[$($name::$variant),+];

            /// Database status ID.
            pub fn id(self) -> StatusId {
                self as StatusId
            }

            /// Seeded name, as used on the wire.
            pub fn name(self) -> &'static str {
                match self {
                    $( $name::$variant => $label ),+
                }
            }

            pub fn from_id(id: StatusId) -> Option<Self> {
                Self::ALL.iter().copied().find(|s| s.id() == id)
            }

            pub fn from_name(name: &str) -> Option<Self> {
                Self::ALL.iter().copied().find(|s| s.name() == name)
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
    /// Lifecycle of a design variant. A failed production run returns the
    /// variant to `Preview` with an error message.
    DesignVariantStatus {
        Preview = 1 => "preview",
        Selected = 2 => "selected",
        Generating = 3 => "generating",
        Generated = 4 => "generated",
    }
}

define_status_enum! {
    /// Lifecycle of a production instruction.
    InstructionStatus {
        Pending = 1 => "pending",
        Processing = 2 => "processing",
        Completed = 3 => "completed",
        Failed = 4 => "failed",
    }
}

impl InstructionStatus {
    /// Pending or processing: the variant already has a job in flight.
    pub fn is_active(self) -> bool {
        matches!(self, InstructionStatus::Pending | InstructionStatus::Processing)
    }
}
