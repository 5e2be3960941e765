//! Opaque identities of graph entities.
//!
//! All identities wrap a UUID. Their `Ord` is the lexicographic order of the
//! UUID bytes, which the router uses as its last tie-break.

use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Namespace for identities derived from names (see `from_name`).
const RAILNET_NAMESPACE: Uuid = Uuid::from_u128(0x6d1c_9a3e_52f4_4b0e_9c1e_8a2f_7b3d_4e51);

macro_rules! identity {
    ($(#[$meta:meta])* $name:ident, $tag:literal) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(Uuid);

        impl $name {
            /// A fresh random identity.
            pub fn new() -> Self {
                Self(Uuid::new_v4())
            }

            /// A stable identity derived from a human readable name.
            pub fn from_name(name: &str) -> Self {
                Self(Uuid::new_v5(&RAILNET_NAMESPACE, format!("{}:{}", $tag, name).as_bytes()))
            }

            pub const fn from_u128(value: u128) -> Self {
                Self(Uuid::from_u128(value))
            }

            pub fn as_uuid(&self) -> &Uuid {
                &self.0
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl From<Uuid> for $name {
            fn from(uuid: Uuid) -> Self {
                Self(uuid)
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}:{}", $tag, self.0)
            }
        }
    };
}

identity!(
    /// Identity of a network endpoint.
    NodeId,
    "node"
);
identity!(
    /// Identity of a track section.
    EdgeId,
    "edge"
);
identity!(
    /// Identity of a line.
    LineId,
    "line"
);
identity!(
    /// Identity of a train (or a single cart).
    TrainId,
    "train"
);
identity!(
    /// Identity of a rail network.
    NetworkId,
    "net"
);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_name_is_stable() {
        assert_eq!(NodeId::from_name("Alpha"), NodeId::from_name("Alpha"));
        assert_ne!(NodeId::from_name("Alpha"), NodeId::from_name("Beta"));
    }

    #[test]
    fn test_kinds_do_not_collide() {
        let node = NodeId::from_name("x");
        let edge = EdgeId::from_name("x");
        assert_ne!(node.as_uuid(), edge.as_uuid());
    }

    #[test]
    fn test_order_follows_uuid_bytes() {
        assert!(EdgeId::from_u128(1) < EdgeId::from_u128(2));
    }
}
