use super::{OneOrMany, SendCall, SendReply};
use crate::domain::{MobileNumber, Password, ResultCode, SendSms, SubPort, UserId};

pub fn encode_send_call(
    user_id: &UserId,
    password: &Password,
    sub_port: &SubPort,
    request: &SendSms,
) -> SendCall {
    let mobiles = request
        .mobiles()
        .iter()
        .map(MobileNumber::raw)
        .collect::<Vec<_>>()
        .join(",");

    SendCall {
        user_id: user_id.as_str().to_owned(),
        password: password.as_str().to_owned(),
        mobiles,
        message: request.content().as_str().to_owned(),
        mobile_count: request.mobiles().len(),
        sub_port: sub_port.as_str().to_owned(),
    }
}

/// Extract the result code, falling back to [`ResultCode::MISSING`] for an empty reply.
pub fn decode_send_reply(reply: Option<OneOrMany<SendReply>>) -> ResultCode {
    reply
        .and_then(OneOrMany::first)
        .and_then(|reply| reply.result)
        .map(ResultCode::new)
        .unwrap_or_else(ResultCode::missing)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encode_joins_mobiles_in_order() {
        let request = SendSms::from_raw(["13900000000", "13800000000"], "hello").unwrap();
        let call = encode_send_call(
            &UserId::new("J10001").unwrap(),
            &Password::new("secret").unwrap(),
            &SubPort::any(),
            &request,
        );

        assert_eq!(
            call,
            SendCall {
                user_id: "J10001".to_owned(),
                password: "secret".to_owned(),
                mobiles: "13900000000,13800000000".to_owned(),
                message: "hello".to_owned(),
                mobile_count: 2,
                sub_port: "*".to_owned(),
            }
        );
    }

    #[test]
    fn decode_unwraps_single_element_sequence() {
        let bare = decode_send_reply(Some(OneOrMany::One(SendReply::new("0"))));
        let wrapped = decode_send_reply(Some(OneOrMany::Many(vec![SendReply::new("0")])));
        assert_eq!(bare, wrapped);
        assert_eq!(bare.as_str(), "0");
    }

    #[test]
    fn decode_falls_back_to_missing_code() {
        assert_eq!(decode_send_reply(None), ResultCode::missing());
        assert_eq!(
            decode_send_reply(Some(OneOrMany::Many(Vec::new()))),
            ResultCode::missing()
        );
        assert_eq!(
            decode_send_reply(Some(OneOrMany::One(SendReply::default()))),
            ResultCode::missing()
        );
    }
}
