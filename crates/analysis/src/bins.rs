use serde::Serialize;

/// Comment-count ranges: `0, 1, 2, 3-5, 6-10, 11-20, 21+`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub enum CommentBin {
    #[serde(rename = "0")]
    Zero,
    #[serde(rename = "1")]
    One,
    #[serde(rename = "2")]
    Two,
    #[serde(rename = "3-5")]
    ThreeToFive,
    #[serde(rename = "6-10")]
    SixToTen,
    #[serde(rename = "11-20")]
    ElevenToTwenty,
    #[serde(rename = "21+")]
    MoreThanTwenty,
}

impl CommentBin {
    pub const ALL: [CommentBin; 7] = [
        CommentBin::Zero,
        CommentBin::One,
        CommentBin::Two,
        CommentBin::ThreeToFive,
        CommentBin::SixToTen,
        CommentBin::ElevenToTwenty,
        CommentBin::MoreThanTwenty,
    ];

    /// `None` for negative counts.
    pub fn of(count: i64) -> Option<Self> {
        Some(match count {
            i64::MIN..=-1 => return None,
            0 => Self::Zero,
            1 => Self::One,
            2 => Self::Two,
            3..=5 => Self::ThreeToFive,
            6..=10 => Self::SixToTen,
            11..=20 => Self::ElevenToTwenty,
            _ => Self::MoreThanTwenty,
        })
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Zero => "0",
            Self::One => "1",
            Self::Two => "2",
            Self::ThreeToFive => "3-5",
            Self::SixToTen => "6-10",
            Self::ElevenToTwenty => "11-20",
            Self::MoreThanTwenty => "21+",
        }
    }
}
