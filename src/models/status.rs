use serde::{Deserialize, Serialize};

/// The lifecycle state of a node.
///
/// - `ToPack`: default resting state; an id missing from the state map is `ToPack`
/// - `Packed`: already in the luggage
/// - `NotNeeded`: deliberately left behind
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Status {
    #[default]
    ToPack,
    Packed,
    NotNeeded,
}

impl Status {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ToPack => "to-pack",
            Self::Packed => "packed",
            Self::NotNeeded => "not-needed",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "to-pack" => Some(Self::ToPack),
            "packed" => Some(Self::Packed),
            "not-needed" => Some(Self::NotNeeded),
            _ => None,
        }
    }

    /// Stored form used by the persisted state map: `ToPack` is written as `null`.
    pub fn to_stored(self) -> Option<&'static str> {
        match self {
            Self::ToPack => None,
            other => Some(other.as_str()),
        }
    }

    pub fn from_stored(value: Option<&str>) -> Option<Self> {
        match value {
            None => Some(Self::ToPack),
            Some(s) => Self::from_str(s),
        }
    }
}

/// A status a user can mark a node with. Restoring to `ToPack` has its own
/// operations, so it is not representable here.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Mark {
    Packed,
    NotNeeded,
}

impl From<Mark> for Status {
    fn from(mark: Mark) -> Self {
        match mark {
            Mark::Packed => Status::Packed,
            Mark::NotNeeded => Status::NotNeeded,
        }
    }
}
