use chrono::NaiveDate;

/// 純粋関数：延滞料金を計算する
///
/// ビジネスルール：
/// - `max(0, 返却日 - 返却期限の日数差) * 日額レート`
/// - 期限内または期限当日の返却は0
/// - 暦日単位で計算する（時刻の端数は扱わない）
///
/// 副作用なし。レートは設定から渡される（デフォルト: 5通貨単位/日）。
pub fn overdue_fine(due_date: NaiveDate, return_date: NaiveDate, rate_per_day: i64) -> i64 {
    let days_overdue = (return_date - due_date).num_days().max(0);
    days_overdue * rate_per_day
}
