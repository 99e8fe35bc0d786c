use bourse_protocol::{
    TradingReply, TradingRequest,
    admin::{
        GenerationStatusReply, GenerationStatusRequest, HaltPhaseReply, HaltPhaseRequest,
        RecoverMarketStateReply, RecoverMarketStateRequest, ResumePhaseReply, ResumePhaseRequest,
        StartGenerationReply, StartGenerationRequest, StopGenerationReply, StopGenerationRequest,
        StoreMarketStateReply, StoreMarketStateRequest,
    },
    session::SessionTerminatedEvent,
    trading::{InstrumentState, InstrumentStateRequest},
};
use parking_lot::RwLock;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info, warn};

/// Receiver bound to the trading request channel (the engine fleet side).
pub trait TradingRequestReceiver: Send + Sync {
    fn process(&self, request: TradingRequest);

    /// Internal request/reply path used by the synthetic-flow generator.
    ///
    /// `None` when the named instrument can not be resolved - the request carries no
    /// route for a reject reply.
    fn process_instrument_state_request(
        &self,
        request: InstrumentStateRequest,
    ) -> Option<InstrumentState>;
}

/// Receiver bound to the trading reply channel (the gateway dispatcher side).
///
/// In practice a dispatcher that fans each reply out to the FIX acceptor or the
/// generator, depending on the reply's session variant.
pub trait TradingReplyReceiver: Send + Sync {
    fn process(&self, reply: TradingReply);
}

/// Receiver bound to the trading admin channel (halt/resume, store/recover).
pub trait TradingAdminRequestReceiver: Send + Sync {
    fn process_halt(&self, request: HaltPhaseRequest) -> HaltPhaseReply;
    fn process_resume(&self, request: ResumePhaseRequest) -> ResumePhaseReply;
    fn process_store(&self, request: StoreMarketStateRequest) -> StoreMarketStateReply;
    fn process_recover(&self, request: RecoverMarketStateRequest) -> RecoverMarketStateReply;
}

/// Receiver bound to the generator admin channel.
pub trait GeneratorAdminRequestReceiver: Send + Sync {
    fn process_status(&self, request: GenerationStatusRequest) -> GenerationStatusReply;
    fn process_start(&self, request: StartGenerationRequest) -> StartGenerationReply;
    fn process_stop(&self, request: StopGenerationRequest) -> StopGenerationReply;
}

/// Listener bound to the trading session event channel.
pub trait TradingSessionEventListener: Send + Sync {
    fn on_session_terminated(&self, event: SessionTerminatedEvent);
}

/// Sending over a channel whose receiver has not been bound, or has already been
/// released.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Error)]
pub enum ChannelUnboundError {
    #[error("trading request channel is not bound")]
    TradingRequest,

    #[error("trading reply channel is not bound")]
    TradingReply,

    #[error("trading admin channel is not bound")]
    TradingAdmin,

    #[error("generator admin channel is not bound")]
    GeneratorAdmin,

    #[error("trading session event channel is not bound")]
    TradingSessionEvent,
}

/// A process-wide registration slot holding at most one receiver.
///
/// Binding replaces the current receiver; the slot hands out `Arc` clones so a bound
/// receiver outlives any in-flight send that already obtained it.
struct Channel<R: ?Sized> {
    receiver: RwLock<Option<Arc<R>>>,
}

impl<R: ?Sized> Channel<R> {
    const fn new() -> Self {
        Self {
            receiver: RwLock::new(None),
        }
    }

    fn bind(&self, receiver: Arc<R>) {
        *self.receiver.write() = Some(receiver);
    }

    fn release(&self) {
        *self.receiver.write() = None;
    }

    fn receiver(&self) -> Option<Arc<R>> {
        self.receiver.read().clone()
    }
}

impl<R: ?Sized> std::fmt::Debug for Channel<R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Channel")
            .field("bound", &self.receiver.read().is_some())
            .finish()
    }
}

static TRADING_REQUEST_CHANNEL: Channel<dyn TradingRequestReceiver> = Channel::new();
static TRADING_REPLY_CHANNEL: Channel<dyn TradingReplyReceiver> = Channel::new();
static TRADING_ADMIN_CHANNEL: Channel<dyn TradingAdminRequestReceiver> = Channel::new();
static GENERATOR_ADMIN_CHANNEL: Channel<dyn GeneratorAdminRequestReceiver> = Channel::new();
static TRADING_SESSION_EVENT_CHANNEL: Channel<dyn TradingSessionEventListener> = Channel::new();

// Trading request channel

pub fn bind_trading_request_channel(receiver: Arc<dyn TradingRequestReceiver>) {
    TRADING_REQUEST_CHANNEL.bind(receiver);
    info!("trading request channel bound");
}

pub fn release_trading_request_channel() {
    TRADING_REQUEST_CHANNEL.release();
    info!("trading request channel released");
}

pub fn send_trading_request(request: TradingRequest) -> Result<(), ChannelUnboundError> {
    let Some(receiver) = TRADING_REQUEST_CHANNEL.receiver() else {
        warn!(
            message = request.name(),
            "unable to send message via trading request channel, probably channel has \
             not been bound or has been released already"
        );
        return Err(ChannelUnboundError::TradingRequest);
    };

    debug!(
        message = request.name(),
        "trading request channel is transferring message"
    );
    receiver.process(request);
    Ok(())
}

pub fn send_instrument_state_request(
    request: InstrumentStateRequest,
) -> Result<Option<InstrumentState>, ChannelUnboundError> {
    let Some(receiver) = TRADING_REQUEST_CHANNEL.receiver() else {
        warn!(
            "unable to send message via trading request channel, probably channel has \
             not been bound or has been released already, can not dispatch \
             InstrumentStateRequest"
        );
        return Err(ChannelUnboundError::TradingRequest);
    };

    debug!("trading request channel is transferring InstrumentStateRequest internal request");
    Ok(receiver.process_instrument_state_request(request))
}

// Trading reply channel

pub fn bind_trading_reply_channel(receiver: Arc<dyn TradingReplyReceiver>) {
    TRADING_REPLY_CHANNEL.bind(receiver);
    info!("trading reply channel bound");
}

pub fn release_trading_reply_channel() {
    TRADING_REPLY_CHANNEL.release();
    info!("trading reply channel released");
}

pub fn send_trading_reply(reply: TradingReply) -> Result<(), ChannelUnboundError> {
    let Some(receiver) = TRADING_REPLY_CHANNEL.receiver() else {
        warn!(
            message = reply.name(),
            "unable to send message via trading reply channel, probably channel has not \
             been bound or has been released already"
        );
        return Err(ChannelUnboundError::TradingReply);
    };

    debug!(
        message = reply.name(),
        "trading reply channel is transferring message"
    );
    receiver.process(reply);
    Ok(())
}

// Trading admin channel

pub fn bind_trading_admin_channel(receiver: Arc<dyn TradingAdminRequestReceiver>) {
    TRADING_ADMIN_CHANNEL.bind(receiver);
    info!("trading admin channel bound");
}

pub fn release_trading_admin_channel() {
    TRADING_ADMIN_CHANNEL.release();
    info!("trading admin channel released");
}

fn trading_admin_receiver()
-> Result<Arc<dyn TradingAdminRequestReceiver>, ChannelUnboundError> {
    TRADING_ADMIN_CHANNEL.receiver().ok_or_else(|| {
        warn!(
            "unable to send message via trading admin channel, probably channel has not \
             been bound or has been released already"
        );
        ChannelUnboundError::TradingAdmin
    })
}

pub fn send_halt_request(request: HaltPhaseRequest) -> Result<HaltPhaseReply, ChannelUnboundError> {
    debug!("trading admin channel is transferring HaltPhaseRequest");
    Ok(trading_admin_receiver()?.process_halt(request))
}

pub fn send_resume_request(
    request: ResumePhaseRequest,
) -> Result<ResumePhaseReply, ChannelUnboundError> {
    debug!("trading admin channel is transferring ResumePhaseRequest");
    Ok(trading_admin_receiver()?.process_resume(request))
}

pub fn send_store_request(
    request: StoreMarketStateRequest,
) -> Result<StoreMarketStateReply, ChannelUnboundError> {
    debug!("trading admin channel is transferring StoreMarketStateRequest");
    Ok(trading_admin_receiver()?.process_store(request))
}

pub fn send_recover_request(
    request: RecoverMarketStateRequest,
) -> Result<RecoverMarketStateReply, ChannelUnboundError> {
    debug!("trading admin channel is transferring RecoverMarketStateRequest");
    Ok(trading_admin_receiver()?.process_recover(request))
}

// Generator admin channel

pub fn bind_generator_admin_channel(receiver: Arc<dyn GeneratorAdminRequestReceiver>) {
    GENERATOR_ADMIN_CHANNEL.bind(receiver);
    info!("generator admin channel bound");
}

pub fn release_generator_admin_channel() {
    GENERATOR_ADMIN_CHANNEL.release();
    info!("generator admin channel released");
}

fn generator_admin_receiver()
-> Result<Arc<dyn GeneratorAdminRequestReceiver>, ChannelUnboundError> {
    GENERATOR_ADMIN_CHANNEL.receiver().ok_or_else(|| {
        warn!(
            "unable to send message via generator admin channel, probably channel has \
             not been bound or has been released already"
        );
        ChannelUnboundError::GeneratorAdmin
    })
}

pub fn send_generation_status_request(
    request: GenerationStatusRequest,
) -> Result<GenerationStatusReply, ChannelUnboundError> {
    debug!("generator admin channel is transferring GenerationStatusRequest");
    Ok(generator_admin_receiver()?.process_status(request))
}

pub fn send_start_generation_request(
    request: StartGenerationRequest,
) -> Result<StartGenerationReply, ChannelUnboundError> {
    debug!("generator admin channel is transferring StartGenerationRequest");
    Ok(generator_admin_receiver()?.process_start(request))
}

pub fn send_stop_generation_request(
    request: StopGenerationRequest,
) -> Result<StopGenerationReply, ChannelUnboundError> {
    debug!("generator admin channel is transferring StopGenerationRequest");
    Ok(generator_admin_receiver()?.process_stop(request))
}

// Trading session event channel

pub fn bind_trading_session_event_channel(listener: Arc<dyn TradingSessionEventListener>) {
    TRADING_SESSION_EVENT_CHANNEL.bind(listener);
    info!("trading session event channel bound");
}

pub fn release_trading_session_event_channel() {
    TRADING_SESSION_EVENT_CHANNEL.release();
    info!("trading session event channel released");
}

pub fn emit_session_terminated(event: SessionTerminatedEvent) -> Result<(), ChannelUnboundError> {
    let Some(listener) = TRADING_SESSION_EVENT_CHANNEL.receiver() else {
        warn!(
            "unable to emit event via trading session event channel, probably channel \
             has not been bound or has been released already"
        );
        return Err(ChannelUnboundError::TradingSessionEvent);
    };

    debug!("trading session event channel is emitting SessionTerminatedEvent");
    listener.on_session_terminated(event);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use bourse_protocol::session::Session;
    use parking_lot::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    // The channel slots are process-wide; tests touching the same slot must not
    // interleave.
    static CHANNEL_TEST_GUARD: Mutex<()> = Mutex::new(());

    #[derive(Default)]
    struct CountingListener {
        events: AtomicUsize,
    }

    impl TradingSessionEventListener for CountingListener {
        fn on_session_terminated(&self, _: SessionTerminatedEvent) {
            self.events.fetch_add(1, Ordering::SeqCst);
        }
    }

    fn terminated() -> SessionTerminatedEvent {
        SessionTerminatedEvent::new(Session::Generator)
    }

    #[test]
    fn test_send_fails_when_unbound_and_delivers_when_bound() {
        let _guard = CHANNEL_TEST_GUARD.lock();

        release_trading_session_event_channel();
        assert_eq!(
            emit_session_terminated(terminated()),
            Err(ChannelUnboundError::TradingSessionEvent)
        );

        let listener = Arc::new(CountingListener::default());
        bind_trading_session_event_channel(listener.clone());

        emit_session_terminated(terminated()).unwrap();
        assert_eq!(listener.events.load(Ordering::SeqCst), 1);

        release_trading_session_event_channel();
        assert_eq!(
            emit_session_terminated(terminated()),
            Err(ChannelUnboundError::TradingSessionEvent)
        );
    }

    #[test]
    fn test_bind_replaces_previous_receiver() {
        let _guard = CHANNEL_TEST_GUARD.lock();

        let first = Arc::new(CountingListener::default());
        let second = Arc::new(CountingListener::default());

        bind_trading_session_event_channel(first.clone());
        bind_trading_session_event_channel(second.clone());

        emit_session_terminated(terminated()).unwrap();

        assert_eq!(first.events.load(Ordering::SeqCst), 0);
        assert_eq!(second.events.load(Ordering::SeqCst), 1);

        release_trading_session_event_channel();
    }

    #[test]
    fn test_double_release_is_idempotent() {
        let _guard = CHANNEL_TEST_GUARD.lock();

        bind_trading_session_event_channel(Arc::new(CountingListener::default()));
        release_trading_session_event_channel();
        release_trading_session_event_channel();

        assert_eq!(
            emit_session_terminated(terminated()),
            Err(ChannelUnboundError::TradingSessionEvent)
        );
    }
}
