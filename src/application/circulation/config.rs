/// 循環エンジンの設定
///
/// 貸出期間や延滞料金レートをハードコードせず、サービスの依存関係として
/// 明示的に注入する。テストではパラメータを変えて決定的に検証できる。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CirculationConfig {
    /// 貸出期間（日数）。due_date未指定時のデフォルトに使われる
    pub loan_period_days: u64,
    /// 延滞料金の日額レート（通貨単位/日）
    pub fine_rate_per_day: i64,
    /// 利用者1人あたりのActiveな貸出の上限
    pub max_active_issues: usize,
}

impl Default for CirculationConfig {
    fn default() -> Self {
        Self {
            loan_period_days: 14,
            fine_rate_per_day: 5,
            max_active_issues: 5,
        }
    }
}
