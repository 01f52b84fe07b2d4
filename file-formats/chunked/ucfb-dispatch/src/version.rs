/// Source platform a chunked container was shipped for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Platform {
    Pc,
    Ps2,
    Xbox,
}

/// Game-version dialect, differing mostly in texture pixel formats, vertex
/// buffer layouts, and a handful of chunk variants (spec.md §1).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GameVersion {
    SwbfIi,
    Swbf,
}

impl std::str::FromStr for Platform {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pc" => Ok(Self::Pc),
            "ps2" => Ok(Self::Ps2),
            "xbox" => Ok(Self::Xbox),
            other => Err(format!("invalid platform: {other}")),
        }
    }
}

impl std::str::FromStr for GameVersion {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "swbf_ii" => Ok(Self::SwbfIi),
            "swbf" => Ok(Self::Swbf),
            other => Err(format!("invalid game version: {other}")),
        }
    }
}
