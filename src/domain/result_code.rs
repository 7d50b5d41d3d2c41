use crate::domain::value::MessageId;

/// Description used for failure codes missing from [`KnownResultCode`].
pub const UNKNOWN_ERROR: &str = "unknown error";

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
/// Result code returned by `MongateCsSpSendSmsNew`.
///
/// The gateway answers with either a negative error code or an opaque message id, both as
/// strings. The value is preserved as-is.
pub struct ResultCode(String);

impl ResultCode {
    /// Code substituted when the gateway sends no result at all.
    pub const MISSING: &'static str = "-3";

    /// Wrap a result code as returned by the gateway.
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// The code used for an empty reply.
    pub fn missing() -> Self {
        Self(Self::MISSING.to_owned())
    }

    /// Borrow the code as returned by the gateway.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Numeric value when the code is a negative integer, i.e. an error code.
    pub fn error_code(&self) -> Option<i64> {
        let trimmed = self.0.trim();
        if !trimmed.starts_with('-') {
            return None;
        }
        trimmed.parse::<i64>().ok()
    }

    /// Map this code to a catalogued error, if it is one.
    pub fn known(&self) -> Option<KnownResultCode> {
        self.error_code().and_then(KnownResultCode::from_code)
    }

    /// Decide whether the send was accepted.
    ///
    /// Catalogued codes and any other negative (or empty) code are failures; everything
    /// else is the message id of an accepted send.
    pub fn classify(&self) -> Outcome {
        let trimmed = self.0.trim();
        if trimmed.is_empty() || trimmed.starts_with('-') {
            let description = self
                .known()
                .map(KnownResultCode::description)
                .unwrap_or(UNKNOWN_ERROR);
            return Outcome::Rejected { description };
        }
        Outcome::Accepted(MessageId::new(trimmed))
    }
}

impl std::fmt::Display for ResultCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
/// Interpretation of a [`ResultCode`].
pub enum Outcome {
    Accepted(MessageId),
    Rejected { description: &'static str },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[non_exhaustive]
/// Error codes documented by the gateway.
pub enum KnownResultCode {
    EmptyParameterOrLoginFailed,
    TooManyNumbers,
    UnknownReason,
    BufferAllocationFailed,
    NonDigitInNumber,
    AbnormalNumber,
    NumberCountMismatch,
    TooManyActualNumbers,
    SendWaitTimeout,
    SendOrReceiveFailed,
    ReceiveTimeout,
    OtherError,
    WebServerInternalError,
    LoginFailed,
    InvalidSubmitFormat,
    InsufficientBalance,
    InvalidMobileNumber,
    BillingAccountInvalid,
    BillingPasswordInvalid,
    AccountDisabled,
    AccountTypeUnsupported,
    Other,
    InvalidEnterpriseCode,
    MessageTooLong,
    UnicomNumbersNotAllowed,
    OperatorPermissionDenied,
    InvalidRateCode,
    ServerBusy,
    EnterprisePermissionDenied,
    SendingWindowClosed,
    DealerCredentialsInvalid,
    InvalidMobileListOrRule,
    NoAccountToggleRight,
    NoUserTypeChangeRight,
    NoDealerChangeRight,
    DealerCredentialsRejected,
    OperatorCredentialsInvalid,
    RechargeTargetNotFound,
    NoBusinessRechargeRight,
    TrialAccountCannotRecharge,
    ChannelNotPermitted,
    MobileCarrierNotAllowed,
    IllegalNumberRange,
    InvalidUserRateCode,
    IllegalKeyword,
}

impl KnownResultCode {
    /// Convert a raw gateway error code into a known variant.
    pub fn from_code(code: i64) -> Option<Self> {
        Some(match code {
            -1 => Self::EmptyParameterOrLoginFailed,
            -2 => Self::TooManyNumbers,
            -3 => Self::UnknownReason,
            -10 => Self::BufferAllocationFailed,
            -11 => Self::NonDigitInNumber,
            -12 => Self::AbnormalNumber,
            -13 => Self::NumberCountMismatch,
            -14 => Self::TooManyActualNumbers,
            -101 => Self::SendWaitTimeout,
            -102 => Self::SendOrReceiveFailed,
            -103 => Self::ReceiveTimeout,
            -200 => Self::OtherError,
            -999 => Self::WebServerInternalError,
            -10001 => Self::LoginFailed,
            -10002 => Self::InvalidSubmitFormat,
            -10003 => Self::InsufficientBalance,
            -10004 => Self::InvalidMobileNumber,
            -10005 => Self::BillingAccountInvalid,
            -10006 => Self::BillingPasswordInvalid,
            -10007 => Self::AccountDisabled,
            -10008 => Self::AccountTypeUnsupported,
            -10009 => Self::Other,
            -10010 => Self::InvalidEnterpriseCode,
            -10011 => Self::MessageTooLong,
            -10012 => Self::UnicomNumbersNotAllowed,
            -10013 => Self::OperatorPermissionDenied,
            -10014 => Self::InvalidRateCode,
            -10015 => Self::ServerBusy,
            -10016 => Self::EnterprisePermissionDenied,
            -10017 => Self::SendingWindowClosed,
            -10018 => Self::DealerCredentialsInvalid,
            -10019 => Self::InvalidMobileListOrRule,
            -10021 => Self::NoAccountToggleRight,
            -10022 => Self::NoUserTypeChangeRight,
            -10023 => Self::NoDealerChangeRight,
            -10024 => Self::DealerCredentialsRejected,
            -10025 => Self::OperatorCredentialsInvalid,
            -10026 => Self::RechargeTargetNotFound,
            -10027 => Self::NoBusinessRechargeRight,
            -10028 => Self::TrialAccountCannotRecharge,
            -10029 => Self::ChannelNotPermitted,
            -10030 => Self::MobileCarrierNotAllowed,
            -10031 => Self::IllegalNumberRange,
            -10032 => Self::InvalidUserRateCode,
            -10033 => Self::IllegalKeyword,
            _ => return None,
        })
    }

    /// The gateway's own description of the code.
    pub fn description(self) -> &'static str {
        match self {
            Self::EmptyParameterOrLoginFailed => "参数为空。信息、电话号码等有空指针，登陆失败",
            Self::TooManyNumbers => "电话号码个数超过100",
            Self::UnknownReason => "未知原因",
            Self::BufferAllocationFailed => "申请缓存空间失败",
            Self::NonDigitInNumber => "电话号码中有非数字字符",
            Self::AbnormalNumber => "有异常电话号码",
            Self::NumberCountMismatch => "电话号码个数与实际个数不相等",
            Self::TooManyActualNumbers => "实际号码个数超过100",
            Self::SendWaitTimeout => "发送消息等待超时",
            Self::SendOrReceiveFailed => "发送或接收消息失败",
            Self::ReceiveTimeout => "接收消息超时",
            Self::OtherError => "其他错误",
            Self::WebServerInternalError => "web服务器内部错误",
            Self::LoginFailed => "用户登陆不成功",
            Self::InvalidSubmitFormat => "提交格式不正确",
            Self::InsufficientBalance => "用户余额不足",
            Self::InvalidMobileNumber => "手机号码不正确",
            Self::BillingAccountInvalid => "计费用户帐号错误",
            Self::BillingPasswordInvalid => "计费用户密码错",
            Self::AccountDisabled => "账号已经被停用",
            Self::AccountTypeUnsupported => "账号类型不支持该功能",
            Self::Other => "其它错误",
            Self::InvalidEnterpriseCode => "企业代码不正确",
            Self::MessageTooLong => "信息内容超长",
            Self::UnicomNumbersNotAllowed => "不能发送联通号码",
            Self::OperatorPermissionDenied => "操作员权限不够",
            Self::InvalidRateCode => "费率代码不正确",
            Self::ServerBusy => "服务器繁忙",
            Self::EnterprisePermissionDenied => "企业权限不够",
            Self::SendingWindowClosed => "此时间段不允许发送",
            Self::DealerCredentialsInvalid | Self::DealerCredentialsRejected => {
                "经销商用户名或密码错"
            }
            Self::InvalidMobileListOrRule => "手机列表或规则错误",
            Self::NoAccountToggleRight => "没有开停户权限",
            Self::NoUserTypeChangeRight => "没有转换用户类型的权限",
            Self::NoDealerChangeRight => "没有修改用户所属经销商的权限",
            Self::OperatorCredentialsInvalid => "操作员登陆名或密码错误",
            Self::RechargeTargetNotFound => "操作员所充值的用户不存在",
            Self::NoBusinessRechargeRight => "操作员没有充值商务版的权限",
            Self::TrialAccountCannotRecharge => "该用户没有转正不能充值",
            Self::ChannelNotPermitted => "此用户没有权限从此通道发送信息",
            Self::MobileCarrierNotAllowed => "不能发送移动号码",
            Self::IllegalNumberRange => "手机号码(段)非法",
            Self::InvalidUserRateCode => "用户使用的费率代码错误",
            Self::IllegalKeyword => "非法关键词",
        }
    }

    /// Whether this code is likely transient and can be retried by the caller.
    pub fn is_retryable(self) -> bool {
        matches!(
            self,
            Self::SendWaitTimeout
                | Self::SendOrReceiveFailed
                | Self::ReceiveTimeout
                | Self::ServerBusy
                | Self::WebServerInternalError
        )
    }

    /// Whether this code indicates rejected account credentials.
    pub fn is_auth_error(self) -> bool {
        matches!(
            self,
            Self::LoginFailed
                | Self::BillingAccountInvalid
                | Self::BillingPasswordInvalid
                | Self::AccountDisabled
        )
    }
}
