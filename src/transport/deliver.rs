use super::{DeliverCall, DeliverReply, OneOrMany};
use crate::domain::{DeliveryReport, MessageId, Password, QueryReportResponse, UserId};

/// Fields a raw record must have to yield a [`DeliveryReport`].
const REPORT_FIELDS: usize = 9;

#[derive(Debug, thiserror::Error)]
#[error("response.string is undefined.")]
pub struct MissingDeliverResult;

pub fn encode_deliver_call(user_id: &UserId, password: &Password) -> DeliverCall {
    DeliverCall {
        user_id: user_id.as_str().to_owned(),
        password: password.as_str().to_owned(),
        request_type: DeliverCall::REPORTS,
    }
}

pub fn decode_deliver_reply(
    reply: Option<DeliverReply>,
) -> Result<QueryReportResponse, MissingDeliverResult> {
    let records = match reply {
        None => Vec::new(),
        Some(DeliverReply { result: None }) => return Err(MissingDeliverResult),
        Some(DeliverReply {
            result: Some(list),
        }) => list
            .and_then(|list| list.string)
            .map(OneOrMany::into_vec)
            .unwrap_or_default(),
    };

    let mut response = QueryReportResponse::default();
    for record in records {
        match parse_report(&record) {
            Some(report) => response.reports.push(report),
            None => response.malformed.push(record),
        }
    }
    Ok(response)
}

/// Split one comma-delimited record.
///
/// Positions: 2 report time, 3 message id, 5 mobile, 8 status code, 9 status. The rest is
/// ignored.
pub fn parse_report(record: &str) -> Option<DeliveryReport> {
    let fields = record.split(',').collect::<Vec<_>>();
    if fields.len() < REPORT_FIELDS {
        return None;
    }

    Some(DeliveryReport {
        message_id: MessageId::new(fields[2]),
        mobile: fields[4].to_owned(),
        report_time: fields[1].to_owned(),
        status_code: fields[7].to_owned(),
        status: fields[8].to_owned(),
    })
}
