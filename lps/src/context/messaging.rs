//! Events published by the use cases on the application signalling channel
//! of the [`Context`](super::Context).

use time::OffsetDateTime;

use crate::quote::PeginQuote;
use crate::quote::RetainedPeginQuote;

/// Events published once a use case has computed its state change.
#[derive(Debug, Clone, PartialEq)]
pub enum LpsEvent {
    /// A quote was accepted and provider liquidity was locked.
    AcceptedPeginQuote(AcceptedPeginQuoteEvent),
    /// The call on behalf of the user was attempted.
    CallForUserCompleted(CallForUserCompletedEvent),
    /// The deposit proof was submitted to the bridge.
    RegisterPeginCompleted(RegisterPeginCompletedEvent),
}

impl LpsEvent {
    /// The hash of the quote the event is about.
    pub fn quote_hash(&self) -> &str {
        match self {
            LpsEvent::AcceptedPeginQuote(event) => &event.retained_quote.quote_hash,
            LpsEvent::CallForUserCompleted(event) => &event.retained_quote.quote_hash,
            LpsEvent::RegisterPeginCompleted(event) => &event.retained_quote.quote_hash,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct AcceptedPeginQuoteEvent {
    pub quote: PeginQuote,
    pub retained_quote: RetainedPeginQuote,
    pub created_at: OffsetDateTime,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CallForUserCompletedEvent {
    pub quote: PeginQuote,
    pub retained_quote: RetainedPeginQuote,
    /// The rendered error, when the call failed.
    pub error: Option<String>,
    pub created_at: OffsetDateTime,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RegisterPeginCompletedEvent {
    pub retained_quote: RetainedPeginQuote,
    /// The rendered error, when the registration failed.
    pub error: Option<String>,
    pub created_at: OffsetDateTime,
}

impl From<AcceptedPeginQuoteEvent> for LpsEvent {
    fn from(event: AcceptedPeginQuoteEvent) -> Self {
        LpsEvent::AcceptedPeginQuote(event)
    }
}

impl From<CallForUserCompletedEvent> for LpsEvent {
    fn from(event: CallForUserCompletedEvent) -> Self {
        LpsEvent::CallForUserCompleted(event)
    }
}

impl From<RegisterPeginCompletedEvent> for LpsEvent {
    fn from(event: RegisterPeginCompletedEvent) -> Self {
        LpsEvent::RegisterPeginCompleted(event)
    }
}
