//! 工具函数模块
//!
//! 时间戳转换等通用工具；文档的创建时间戳统一以
//! 毫秒整数存储

use chrono::{DateTime, TimeZone, Utc};

/// 获取当前时间戳（毫秒）
pub fn current_millis() -> i64 {
    Utc::now().timestamp_millis()
}

/// 毫秒数转换为 DateTime
pub fn millis_to_datetime(ms: i64) -> Option<DateTime<Utc>> {
    Utc.timestamp_millis_opt(ms).single()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_millis_round_trip() {
        let now = current_millis();
        let dt = millis_to_datetime(now).unwrap();
        assert_eq!(dt.timestamp_millis(), now);
    }

    #[test]
    fn test_millis_out_of_range() {
        assert!(millis_to_datetime(i64::MAX).is_none());
    }
}
