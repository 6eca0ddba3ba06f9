//! Contract-call bridge
//!
//! Lets node-internal logic call contracts registered under well-known
//! 32-byte registry ids, e.g. to read the validator set. Calls run
//! synchronously against a supplied header/state, or against the current
//! chain head when none is given.

use crate::error::ContractCallError;
use crate::ports::ExecutionState;
use primitive_types::U256;
use shared_types::{Address, Header};
use std::time::Instant;
use tracing::{debug, error};

/// Result type for bridge calls
pub type CallResult<T> = std::result::Result<T, ContractCallError>;

/// Execution environment the bridge drives
pub trait CallContext: Send + Sync {
    /// State the calls execute against
    type State: ExecutionState;

    /// Current chain head and an independent copy of its state
    fn current(&self) -> Option<(Header, Self::State)>;

    /// Address registered under `registry_id`.
    ///
    /// `Ok(None)` means the id is not registered; a missing registry is
    /// [`ContractCallError::RegistryNotDeployed`].
    fn registered_address(
        &self,
        registry_id: &[u8; 32],
        header: &Header,
        state: &Self::State,
    ) -> CallResult<Option<Address>>;

    /// Execute a call and return its output and gas left
    #[allow(clippy::too_many_arguments)]
    fn call(
        &self,
        to: Address,
        input: &[u8],
        gas: u64,
        value: U256,
        header: &Header,
        state: &mut Self::State,
        static_call: bool,
    ) -> CallResult<(Vec<u8>, u64)>;

    /// Apply pending end-of-transaction state changes
    fn finalise(&self, state: &mut Self::State);
}

/// Thin wrapper that resolves registry ids and times each call
pub struct ContractCaller<C> {
    ctx: C,
}

impl<C: CallContext> ContractCaller<C> {
    /// Caller over `ctx`
    pub fn new(ctx: C) -> Self {
        Self { ctx }
    }

    /// Underlying call context
    pub fn context(&self) -> &C {
        &self.ctx
    }

    /// Resolve `registry_id` at the current chain head
    pub fn get_registered_address(&self, registry_id: [u8; 32]) -> CallResult<Address> {
        let (header, state) = self.ctx.current().ok_or(ContractCallError::NoChainContext)?;
        self.resolve(&registry_id, &header, &state)
    }

    fn resolve(
        &self,
        registry_id: &[u8; 32],
        header: &Header,
        state: &C::State,
    ) -> CallResult<Address> {
        self.ctx
            .registered_address(registry_id, header, state)?
            .ok_or(ContractCallError::ContractNotDeployed(*registry_id))
    }

    /// Read-only call; the supplied state is left untouched
    pub fn make_static_call(
        &self,
        registry_id: [u8; 32],
        function: &str,
        input: &[u8],
        gas: u64,
        at: Option<(&Header, &C::State)>,
    ) -> CallResult<Vec<u8>> {
        let (header, mut state) = match at {
            Some((header, state)) => (header.clone(), state.copy()),
            None => self.ctx.current().ok_or(ContractCallError::NoChainContext)?,
        };

        let started = Instant::now();
        let result = self.resolve(&registry_id, &header, &state).and_then(|to| {
            self.ctx
                .call(to, input, gas, U256::zero(), &header, &mut state, true)
        });
        self.observe(function, &registry_id, started, result.as_ref().err());

        result.map(|(output, _)| output)
    }

    /// State-changing call.
    ///
    /// Without an explicit header/state the call runs against a copy of the
    /// current head state and its effects are discarded. With
    /// `finalise_state` the context finalises the state after a successful
    /// call. Returns the output and the gas left.
    #[allow(clippy::too_many_arguments)]
    pub fn make_call(
        &self,
        registry_id: [u8; 32],
        function: &str,
        input: &[u8],
        value: U256,
        gas: u64,
        at: Option<(&Header, &mut C::State)>,
        finalise_state: bool,
    ) -> CallResult<(Vec<u8>, u64)> {
        let mut owned = None;
        let (header, state): (&Header, &mut C::State) = match at {
            Some(target) => target,
            None => {
                let current = owned.insert(
                    self.ctx.current().ok_or(ContractCallError::NoChainContext)?,
                );
                (&current.0, &mut current.1)
            }
        };

        let started = Instant::now();
        let result = self
            .resolve(&registry_id, header, state)
            .and_then(|to| self.ctx.call(to, input, gas, value, header, state, false));
        self.observe(function, &registry_id, started, result.as_ref().err());

        if result.is_ok() && finalise_state {
            self.ctx.finalise(state);
        }
        result
    }

    fn observe(
        &self,
        function: &str,
        registry_id: &[u8; 32],
        started: Instant,
        failure: Option<&ContractCallError>,
    ) {
        let elapsed = started.elapsed();
        match failure {
            None => debug!(function, ?elapsed, "[qc-17] Contract call finished"),
            Some(err) => error!(
                function,
                registry = %hex::encode(registry_id),
                %err,
                "[qc-17] Failed to call system contract"
            ),
        }
    }
}
