use serde::{Deserialize, Serialize};

use super::{BookId, CopyId};

/// 蔵書の状態タグ
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CopyCondition {
    New,
    Good,
    Fair,
    Poor,
}

impl CopyCondition {
    /// 文字列表現を取得する
    pub fn as_str(&self) -> &'static str {
        match self {
            CopyCondition::New => "new",
            CopyCondition::Good => "good",
            CopyCondition::Fair => "fair",
            CopyCondition::Poor => "poor",
        }
    }
}

impl std::str::FromStr for CopyCondition {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "new" => Ok(CopyCondition::New),
            "good" => Ok(CopyCondition::Good),
            "fair" => Ok(CopyCondition::Fair),
            "poor" => Ok(CopyCondition::Poor),
            _ => Err(format!("Invalid copy condition: {}", s)),
        }
    }
}

/// 蔵書（物理的な1冊）
///
/// 所有権はカタログコンテキストにある。循環エンジンが書き込むのは
/// `available`フラグのみで、それ以外のフィールドは読み取り専用の参照。
///
/// 不変条件：未返却のIssueがちょうど1件この蔵書を参照している間は
/// `available == false`、それ以外は`available == true`。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BookCopy {
    pub copy_id: CopyId,
    pub book_id: BookId,
    pub available: bool,
    pub condition: CopyCondition,
    pub shelf_location: String,
}
