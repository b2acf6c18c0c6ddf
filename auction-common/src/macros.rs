// Copyright 2024-2025 Golem Cloud
//
// Licensed under the Golem Source License v1.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://license.golem.cloud/LICENSE
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

#[macro_export]
macro_rules! newtype_uuid {
    ($name:ident) => {
        #[derive(
            Copy,
            Clone,
            Debug,
            PartialOrd,
            Ord,
            Eq,
            Hash,
            PartialEq,
            derive_more::Display,
            derive_more::FromStr,
        )]
        #[derive(serde::Serialize, serde::Deserialize)]
        #[serde(transparent)]
        #[display("{_0}")]
        pub struct $name(pub uuid::Uuid);

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl $name {
            pub fn new() -> $name {
                Self(uuid::Uuid::now_v7())
            }
        }

        impl From<$name> for uuid::Uuid {
            fn from(value: $name) -> Self {
                value.0
            }
        }

        impl From<uuid::Uuid> for $name {
            fn from(value: uuid::Uuid) -> Self {
                Self(value)
            }
        }

        impl TryFrom<&str> for $name {
            type Error = String;

            fn try_from(value: &str) -> Result<Self, Self::Error> {
                let uuid =
                    uuid::Uuid::parse_str(value).map_err(|err| format!("Invalid UUID: {err}"))?;
                Ok(Self(uuid))
            }
        }
    };
}

/// Implements `IntoAnyhow` for an error enum having an `InternalError(anyhow::Error)` variant,
/// and forwards the listed sub-errors into that variant.
#[macro_export]
macro_rules! error_forwarding {
    ($target:ty $(, $sub:ty )* $(,)?) => {
        impl $crate::IntoAnyhow for $target {
            fn into_anyhow(self) -> ::anyhow::Error {
                // Converting self through std::error::Error would lose the backtrace of the inner error
                let converted = match self {
                    Self::InternalError(inner) => inner,
                    _ => ::anyhow::Error::from(self),
                };
                converted.context(stringify!($target))
            }
        }

        $(
            impl From<$sub> for $target {
                fn from(value: $sub) -> Self {
                    Self::InternalError(<$sub as $crate::IntoAnyhow>::into_anyhow(value))
                }
            }
        )*
    };
}
