//! Domain layer: strong types with validation and invariants (no I/O).

mod request;
mod response;
mod result_code;
mod validation;
mod value;

pub use request::{Mobiles, SEND_SMS_MAX_MOBILES, SendSms};
pub use response::{DeliveryReport, QueryReportResponse, SendSmsResponse};
pub use result_code::{KnownResultCode, Outcome, ResultCode, UNKNOWN_ERROR};
pub use validation::ValidationError;
pub use value::{MessageId, MessageText, MobileNumber, Password, PhoneNumber, SubPort, UserId};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn user_id_rejects_empty() {
        assert!(matches!(
            UserId::new("   "),
            Err(ValidationError::Empty {
                field: UserId::FIELD
            })
        ));
    }

    #[test]
    fn send_sms_requires_mobiles() {
        let err = SendSms::new(Vec::new(), MessageText::new("x").unwrap()).unwrap_err();
        assert!(matches!(
            err,
            ValidationError::Empty {
                field: MobileNumber::FIELD
            }
        ));
    }

    #[test]
    fn send_sms_requires_content() {
        let err = SendSms::from_raw(["1"], "").unwrap_err();
        assert!(matches!(
            err,
            ValidationError::Empty {
                field: MessageText::FIELD
            }
        ));
    }

    #[test]
    fn send_sms_mobile_limit_is_enforced() {
        let mobile = MobileNumber::new("13800000000").unwrap();
        let msg = MessageText::new("hi").unwrap();
        let mobiles = vec![mobile; SEND_SMS_MAX_MOBILES + 1];
        let err = SendSms::new(mobiles, msg).unwrap_err();
        assert!(matches!(err, ValidationError::TooManyMobiles { .. }));
    }

    #[test]
    fn send_sms_keeps_caller_order() {
        let request = SendSms::from_raw(["139", "138", "137"], "hello").unwrap();
        let raw = request
            .mobiles()
            .iter()
            .map(MobileNumber::raw)
            .collect::<Vec<_>>();
        assert_eq!(raw, vec!["139", "138", "137"]);
        assert_eq!(request.content().as_str(), "hello");
    }

    #[test]
    fn single_mobile_is_a_batch_of_one() {
        let mobiles: Mobiles = "13800000000".into();
        assert_eq!(mobiles.into_vec(), vec!["13800000000".to_owned()]);

        let request = SendSms::one(
            MobileNumber::new("13800000000").unwrap(),
            MessageText::new("hi").unwrap(),
        );
        assert_eq!(request.mobiles().len(), 1);
    }
}
