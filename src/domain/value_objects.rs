use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// 貸出ID - 貸出管理コンテキストの集約ID
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct IssueId(Uuid);

impl IssueId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    pub fn value(&self) -> Uuid {
        self.0
    }
}

impl Default for IssueId {
    fn default() -> Self {
        Self::new()
    }
}

/// 予約ID - 予約管理コンテキストの集約ID
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ReservationId(Uuid);

impl ReservationId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    pub fn value(&self) -> Uuid {
        self.0
    }
}

impl Default for ReservationId {
    fn default() -> Self {
        Self::new()
    }
}

/// 利用者ID - アカウント管理コンテキストへの参照
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct UserId(Uuid);

impl UserId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    pub fn value(&self) -> Uuid {
        self.0
    }
}

impl Default for UserId {
    fn default() -> Self {
        Self::new()
    }
}

/// 書籍ID - カタログ管理コンテキストへの参照（タイトル単位）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BookId(Uuid);

impl BookId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    pub fn value(&self) -> Uuid {
        self.0
    }
}

impl Default for BookId {
    fn default() -> Self {
        Self::new()
    }
}

/// 蔵書ID - 物理的な1冊（コピー）への参照
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CopyId(Uuid);

impl CopyId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    pub fn value(&self) -> Uuid {
        self.0
    }
}

impl Default for CopyId {
    fn default() -> Self {
        Self::new()
    }
}

/// 操作要求者
///
/// アイデンティティコラボレータから受け取る利用者IDと権限フラグ。
/// 予約キャンセルの権限確認と職員限定クエリで使用される。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Requester {
    pub user_id: UserId,
    /// 職員権限（昇格済み）かどうか
    pub elevated: bool,
}

impl Requester {
    /// 一般利用者として作成
    pub fn user(user_id: UserId) -> Self {
        Self {
            user_id,
            elevated: false,
        }
    }

    /// 職員（昇格済み）として作成
    pub fn staff(user_id: UserId) -> Self {
        Self {
            user_id,
            elevated: true,
        }
    }

    /// 所有者本人または職員のみ許可される操作かを判定する
    pub fn may_act_for(&self, owner: UserId) -> bool {
        self.elevated || self.user_id == owner
    }
}
