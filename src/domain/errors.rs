/// 返却のエラー
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CloseIssueError {
    /// 既に返却済み（Returnedは終端状態）
    AlreadyReturned,
}

/// 予約キャンセルのエラー
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CancelReservationError {
    /// 既に履行済み（Fulfilledは終端状態のためキャンセル不可）
    AlreadyFulfilled,
}

/// 予約履行のエラー
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FulfillReservationError {
    /// 既に履行済み
    AlreadyFulfilled,
    /// キャンセル済みの予約は履行できない
    Cancelled,
}
