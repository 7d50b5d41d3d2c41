use crate::domain::validation::ValidationError;
use crate::domain::value::{MessageText, MobileNumber};

/// Largest batch the gateway accepts in one `MongateCsSpSendSmsNew` call.
pub const SEND_SMS_MAX_MOBILES: usize = 100;

#[derive(Debug, Clone)]
/// One send call: the same text to a batch of mobile numbers.
///
/// Invariant: `1..=SEND_SMS_MAX_MOBILES` numbers, kept in caller order.
pub struct SendSms {
    mobiles: Vec<MobileNumber>,
    content: MessageText,
}

impl SendSms {
    pub fn new(mobiles: Vec<MobileNumber>, content: MessageText) -> Result<Self, ValidationError> {
        if mobiles.is_empty() {
            return Err(ValidationError::Empty {
                field: MobileNumber::FIELD,
            });
        }
        if mobiles.len() > SEND_SMS_MAX_MOBILES {
            return Err(ValidationError::TooManyMobiles {
                max: SEND_SMS_MAX_MOBILES,
                actual: mobiles.len(),
            });
        }
        Ok(Self { mobiles, content })
    }

    /// A batch of one.
    pub fn one(mobile: MobileNumber, content: MessageText) -> Self {
        Self {
            mobiles: vec![mobile],
            content,
        }
    }

    /// Validate raw strings into a request.
    pub fn from_raw<I, S>(mobiles: I, content: impl Into<String>) -> Result<Self, ValidationError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mobiles = mobiles
            .into_iter()
            .map(MobileNumber::new)
            .collect::<Result<Vec<_>, _>>()?;
        let content = MessageText::new(content)?;
        Self::new(mobiles, content)
    }

    pub fn mobiles(&self) -> &[MobileNumber] {
        &self.mobiles
    }

    pub fn content(&self) -> &MessageText {
        &self.content
    }
}

#[derive(Debug, Clone)]
/// Mobile numbers accepted by `send_text`: one number or a batch.
pub struct Mobiles(Vec<String>);

impl Mobiles {
    pub fn into_vec(self) -> Vec<String> {
        self.0
    }
}

impl From<&str> for Mobiles {
    fn from(value: &str) -> Self {
        Self(vec![value.to_owned()])
    }
}

impl From<String> for Mobiles {
    fn from(value: String) -> Self {
        Self(vec![value])
    }
}

impl From<Vec<String>> for Mobiles {
    fn from(value: Vec<String>) -> Self {
        Self(value)
    }
}

impl From<Vec<&str>> for Mobiles {
    fn from(value: Vec<&str>) -> Self {
        Self(value.into_iter().map(str::to_owned).collect())
    }
}

impl From<&[&str]> for Mobiles {
    fn from(value: &[&str]) -> Self {
        Self(value.iter().map(|it| (*it).to_owned()).collect())
    }
}

impl<const N: usize> From<[&str; N]> for Mobiles {
    fn from(value: [&str; N]) -> Self {
        Self(value.iter().map(|it| (*it).to_owned()).collect())
    }
}
