use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Activity {
    RoadCycling,
    GravelCycling,
    Running,
    Walking,
}

impl Activity {
    pub const ALL: [Activity; 4] = [
        Activity::RoadCycling,
        Activity::GravelCycling,
        Activity::Running,
        Activity::Walking,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Activity::RoadCycling => "road-cycling",
            Activity::GravelCycling => "gravel-cycling",
            Activity::Running => "running",
            Activity::Walking => "walking",
        }
    }
}

impl std::str::FromStr for Activity {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "road-cycling" => Ok(Activity::RoadCycling),
            "gravel-cycling" => Ok(Activity::GravelCycling),
            "running" => Ok(Activity::Running),
            "walking" => Ok(Activity::Walking),
            other => Err(format!("unknown activity '{other}'")),
        }
    }
}
