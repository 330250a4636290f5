use crate::error::{AppError, AppResult};
use regex::Regex;

/// 验证国内手机号格式（11位，1开头）
pub fn validate_phone(phone: &str) -> AppResult<()> {
    let phone_regex = Regex::new(r"^1[3-9]\d{9}$").unwrap();

    if !phone_regex.is_match(phone) {
        return Err(AppError::ValidationError("手机号格式无效".to_string()));
    }

    Ok(())
}

/// 手机号脱敏: 138****1234
pub fn mask_phone(phone: &str) -> String {
    if phone.len() != 11 {
        return phone.to_string();
    }
    format!("{}****{}", &phone[..3], &phone[7..])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_phone() {
        assert!(validate_phone("13812341234").is_ok());
        assert!(validate_phone("19912341234").is_ok());
        assert!(validate_phone("12812341234").is_err());
        assert!(validate_phone("1381234123").is_err());
        assert!(validate_phone("138123412345").is_err());
        assert!(validate_phone("abcdefghijk").is_err());
    }

    #[test]
    fn test_mask_phone() {
        assert_eq!(mask_phone("13812341234"), "138****1234");
        // 非11位原样返回
        assert_eq!(mask_phone("12345"), "12345");
    }
}
