//! 时间戳值类型：被钳制的 Unix 毫秒数。

use alloc::string::String;
use core::fmt;

/// 时间戳可表示的最小 Unix 毫秒数（约公元前 271821 年）。
pub const MIN_UNIX_MILLIS: i64 = -8_640_000_000_000_000;
/// 时间戳可表示的最大 Unix 毫秒数（约公元 275760 年）。
pub const MAX_UNIX_MILLIS: i64 = 8_640_000_000_000_000;

/// `Timestamp` 表示一个被钳制在可交换范围内的 UTC 时间点。
///
/// # 设计背景（Why）
/// - 线格式与 JSON 投影都以 Unix 毫秒数交换时间点，钳制范围与 ECMAScript
///   `Date` 的有效区间一致，保证任何实现读到的值都落在可表示区间内；
/// - 默认值为 Unix 纪元（0 毫秒），与“默认值压缩为单个零字节”的全局规则吻合。
///
/// # 契约说明（What）
/// - **构造**：[`from_unix_millis`](Self::from_unix_millis) 对超界输入钳制而非报错，
///   解码路径因此永远不会因越界时间戳失败；
/// - **渲染**：[`Display`] 输出 ISO-8601 UTC 文本，被可读 JSON 形态复用。
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Timestamp {
    unix_millis: i64,
}

impl Timestamp {
    /// Unix 纪元（1970-01-01T00:00:00Z）。
    pub const EPOCH: Timestamp = Timestamp { unix_millis: 0 };

    /// 从 Unix 毫秒数构造，超出可表示范围的输入被钳制到边界。
    pub fn from_unix_millis(unix_millis: i64) -> Self {
        Self {
            unix_millis: unix_millis.clamp(MIN_UNIX_MILLIS, MAX_UNIX_MILLIS),
        }
    }

    /// 返回 Unix 毫秒数。
    pub fn unix_millis(self) -> i64 {
        self.unix_millis
    }

    /// 渲染为 ISO-8601 UTC 文本（毫秒为零时省略小数部分）。
    pub fn to_iso8601(self) -> String {
        let millis = self.unix_millis;
        let days = millis.div_euclid(86_400_000);
        let millis_of_day = millis.rem_euclid(86_400_000);
        let (year, month, day) = civil_from_days(days);
        let hour = millis_of_day / 3_600_000;
        let minute = millis_of_day % 3_600_000 / 60_000;
        let second = millis_of_day % 60_000 / 1_000;
        let millisecond = millis_of_day % 1_000;

        let mut out = String::new();
        use core::fmt::Write as _;
        if year < 0 {
            let _ = write!(out, "-{:04}", -year);
        } else if year > 9999 {
            let _ = write!(out, "+{year}");
        } else {
            let _ = write!(out, "{year:04}");
        }
        let _ = write!(out, "-{month:02}-{day:02}T{hour:02}:{minute:02}:{second:02}");
        if millisecond != 0 {
            let _ = write!(out, ".{millisecond:03}");
        }
        out.push('Z');
        out
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_iso8601())
    }
}

/// 将纪元日数转换为公历 (年, 月, 日)。
///
/// 标准的“纪元日 → 公历”整数算法：以 400 年（146097 天）为一个纪元周期，
/// 在周期内先定位年份再回推月日；对负日数同样正确。
fn civil_from_days(days: i64) -> (i64, i64, i64) {
    let z = days + 719_468;
    let era = if z >= 0 { z } else { z - 146_096 } / 146_097;
    let day_of_era = z - era * 146_097;
    let year_of_era =
        (day_of_era - day_of_era / 1_460 + day_of_era / 36_524 - day_of_era / 146_096) / 365;
    let year = year_of_era + era * 400;
    let day_of_year = day_of_era - (365 * year_of_era + year_of_era / 4 - year_of_era / 100);
    let mp = (5 * day_of_year + 2) / 153;
    let day = day_of_year - (153 * mp + 2) / 5 + 1;
    let month = if mp < 10 { mp + 3 } else { mp - 9 };
    (if month <= 2 { year + 1 } else { year }, month, day)
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::string::ToString;

    #[test]
    fn epoch_renders_without_millis() {
        assert_eq!(Timestamp::EPOCH.to_string(), "1970-01-01T00:00:00Z");
    }

    #[test]
    fn renders_date_time_and_millis() {
        // 2001-09-09T01:46:40.123Z = 1_000_000_000_123 ms。
        let ts = Timestamp::from_unix_millis(1_000_000_000_123);
        assert_eq!(ts.to_string(), "2001-09-09T01:46:40.123Z");
    }

    #[test]
    fn renders_pre_epoch_instants() {
        let ts = Timestamp::from_unix_millis(-86_400_000);
        assert_eq!(ts.to_string(), "1969-12-31T00:00:00Z");
    }

    #[test]
    fn clamps_out_of_range_inputs() {
        // Why: 解码路径依赖构造时钳制，越界毫秒数不允许流入冻结值。
        assert_eq!(
            Timestamp::from_unix_millis(i64::MAX).unix_millis(),
            MAX_UNIX_MILLIS
        );
        assert_eq!(
            Timestamp::from_unix_millis(i64::MIN).unix_millis(),
            MIN_UNIX_MILLIS
        );
    }
}
