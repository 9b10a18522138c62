use async_trait::async_trait;

use super::Result;
use crate::domain::{BookCopy, CopyId};

/// `try_acquire`の結果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AcquireOutcome {
    /// 確保に成功した（available: true → false）
    Acquired,
    /// 既に貸出中だった
    AlreadyOnLoan,
    /// 蔵書が存在しない
    NotFound,
}

/// 蔵書可用性台帳ポート
///
/// 各蔵書が貸出可能かどうかの唯一の真実の源。`available`フラグを
/// 書き込むのはこの台帳だけで、他のコンポーネントは読み取りのみ。
///
/// エンジン全体の中核的な正しさの性質：同一蔵書への並行した
/// `try_acquire`では、ちょうど1つの呼び出しだけが成功を観測する。
/// 実装は単一のアトミックなread-modify-write（行ロックまたは
/// compare-and-swap相当）でなければならず、読み取りと書き込みを
/// 分離してはならない。
#[async_trait]
pub trait CopyLedger: Send + Sync {
    /// 蔵書を貸出中にする（アトミックなcheck-and-set）
    ///
    /// 直前までavailableだった場合に限り`Acquired`を返す。
    async fn try_acquire(&self, copy_id: CopyId) -> Result<AcquireOutcome>;

    /// 蔵書を無条件に貸出可能へ戻す（冪等）
    async fn release(&self, copy_id: CopyId) -> Result<()>;

    /// 蔵書を取得する（カタログコラボレータ向けの参照）
    async fn get(&self, copy_id: CopyId) -> Result<Option<BookCopy>>;
}
