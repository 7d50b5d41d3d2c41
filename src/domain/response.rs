use crate::domain::value::MessageId;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SendSmsResponse {
    pub message_id: MessageId,
}

#[derive(Debug, Clone, PartialEq, Eq)]
/// Final delivery status of a previously sent message.
///
/// Fields are kept as the gateway wrote them.
pub struct DeliveryReport {
    pub message_id: MessageId,
    pub mobile: String,
    pub report_time: String,
    pub status_code: String,
    pub status: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct QueryReportResponse {
    /// Reports in gateway order.
    pub reports: Vec<DeliveryReport>,
    /// Raw records with fewer fields than a report needs.
    pub malformed: Vec<String>,
}
