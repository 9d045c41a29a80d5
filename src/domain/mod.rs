/// Domain types and input parsing
///
/// Request bodies are deserialized into plain `*Request` structs and turned
/// into validated values here, so route handlers only bind already-checked
/// data to SQL.

/// Declares a closed set of string values stored as TEXT.
///
/// Deserializing an unknown value fails with a message listing the accepted
/// values, which surfaces as a 400.
macro_rules! string_enum {
    (
        $(#[$meta:meta])*
        $vis:vis enum $name:ident ($field:literal) {
            $($variant:ident => $value:literal),+ $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        $vis enum $name {
            $($variant),+
        }

        impl $name {
            pub const ALL: &'static [$name] = &[$($name::$variant),+];

            pub fn as_str(&self) -> &'static str {
                match self {
                    $($name::$variant => $value),+
                }
            }

            pub fn parse(value: &str) -> Result<Self, crate::error::ValidationError> {
                match value.trim().to_ascii_lowercase().as_str() {
                    $($value => Ok($name::$variant),)+
                    _ => Err(crate::error::ValidationError::InvalidValue(
                        $field.to_string(),
                        format!("must be one of: {}", Self::allowed()),
                    )),
                }
            }

            pub fn allowed() -> String {
                Self::ALL.iter().map(|v| v.as_str()).collect::<Vec<_>>().join(", ")
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl std::str::FromStr for $name {
            type Err = crate::error::ValidationError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Self::parse(s)
            }
        }

        impl serde::Serialize for $name {
            fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
                serializer.serialize_str(self.as_str())
            }
        }

        impl<'de> serde::Deserialize<'de> for $name {
            fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
                let raw = String::deserialize(deserializer)?;
                Self::parse(&raw).map_err(serde::de::Error::custom)
            }
        }
    };
}

pub mod ad;
pub mod analytics;
pub mod campaign;
pub mod instagram;
pub mod user;
pub mod youtube;
