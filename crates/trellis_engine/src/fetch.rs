//! # Refresh Cycles
//!
//! One cycle walks three stages, each a no-op once its work is done:
//! discovery (find the token and reward contracts behind the farm and
//! resolve bindings for them), metadata (names, symbols, the seed per-share
//! rate), and the per-cycle read fan-out. Reads run concurrently, every
//! failure is absorbed into a diagnostic record, and the cycle always ends
//! with a single snapshot publication. Nothing here returns an error to the
//! caller; a bad cycle is a thinner merge, not a crash.

use std::sync::Arc;

use alloy_primitives::{Address, U256};
use tracing::debug;

use trellis_chain::{
    BindingFactory, BindingSlot, CallError, CallGateway, CallSpec, CallValue, ContractBinding,
    InterfaceKind, PositionInfo, ResolveError, WalletSigner,
};

use crate::descriptor::{FarmDescriptor, PerShareRefresh, StakeAccounting};
use crate::diagnostics::{DiagnosticRecord, DiagnosticsHub};
use crate::snapshot::{CycleReads, RewardEntry, SyncedFarmState, TokenMetadata};

/// Successful pieces of the position read, whichever accounting shape ran.
#[derive(Default)]
struct PositionReads {
    staked: Option<U256>,
    last_deposit_time: Option<u64>,
    unlock_time: Option<u64>,
    share_balance: Option<U256>,
    underlying_balance: Option<U256>,
}

/// Runs refresh cycles for one mounted farm.
pub struct FetchCoordinator {
    descriptor: FarmDescriptor,
    farm: ContractBinding,
    state: Arc<SyncedFarmState>,
    factory: Arc<dyn BindingFactory>,
    signer: Arc<dyn WalletSigner>,
    diagnostics: DiagnosticsHub,
}

impl FetchCoordinator {
    /// Wire a coordinator to its farm binding and shared state.
    #[must_use]
    pub fn new(
        descriptor: FarmDescriptor,
        farm: ContractBinding,
        state: Arc<SyncedFarmState>,
        factory: Arc<dyn BindingFactory>,
        signer: Arc<dyn WalletSigner>,
        diagnostics: DiagnosticsHub,
    ) -> Self {
        Self {
            descriptor,
            farm,
            state,
            factory,
            signer,
            diagnostics,
        }
    }

    /// Run one full refresh cycle and publish the merged snapshot.
    ///
    /// Idempotent per tick: admission control lives in the scheduler, not
    /// here. After teardown the cycle is a no-op.
    pub async fn run_cycle<G: CallGateway>(&self, gateway: &G) {
        if self.state.is_torn_down() {
            return;
        }
        self.resolve_bindings(gateway).await;
        self.resolve_metadata(gateway).await;
        let reads = self.collect_reads(gateway).await;

        let previous = self.state.snapshot();
        let mut next = previous.merged(reads);
        next.is_initialized = previous.is_initialized
            || (self.state.metadata_resolved() && self.descriptor.required_ready(&next));
        if self.state.publish(next) {
            self.state.stats.record_cycle();
            debug!(farm = %self.descriptor.name, "refresh cycle published");
        }
    }

    /// Discover token addresses behind the farm and resolve bindings.
    ///
    /// A failed discovery read leaves the slot unresolved for the next
    /// cycle; a failed resolution marks it failed for good.
    async fn resolve_bindings<G: CallGateway>(&self, gateway: &G) {
        if self.state.token_slot().is_unresolved() {
            if let Some(address) = self
                .read_addr(gateway, self.farm, self.descriptor.token_discovery_call())
                .await
            {
                match self.factory.resolve(address, InterfaceKind::Erc20) {
                    Ok(binding) => self.state.set_token_slot(BindingSlot::Ready(binding)),
                    Err(error) => {
                        self.state.set_token_slot(BindingSlot::Failed);
                        self.report_resolve("resolve_staked_token", &error);
                    }
                }
            }
        }

        if self.state.reward_slot().is_unresolved() {
            if let Some(address) = self
                .read_addr(gateway, self.farm, self.descriptor.reward_discovery_call())
                .await
            {
                match self.factory.resolve(address, InterfaceKind::Erc20) {
                    Ok(binding) => self.state.set_reward_slot(BindingSlot::Ready(binding)),
                    Err(error) => {
                        self.state.set_reward_slot(BindingSlot::Failed);
                        self.report_resolve("resolve_reward_token", &error);
                    }
                }
            }
        }

        // Share-accounting farms are themselves the share token.
        if self.descriptor.accounting == StakeAccounting::Shares
            && self.state.shares_slot().is_unresolved()
        {
            match self
                .factory
                .resolve(self.descriptor.farm_address, InterfaceKind::Erc20)
            {
                Ok(binding) => self.state.set_shares_slot(BindingSlot::Ready(binding)),
                Err(error) => {
                    self.state.set_shares_slot(BindingSlot::Failed);
                    self.report_resolve("resolve_share_token", &error);
                }
            }
        }

        // Second hop: the staked token wraps a compounded underlying whose
        // symbol the dashboard shows next to the wrapper's.
        if self.descriptor.compounded_symbol_hop && self.state.compounded_slot().is_unresolved() {
            if let Some(token) = self.state.token_slot().binding() {
                match self
                    .factory
                    .resolve(token.address, InterfaceKind::StrategyFarm)
                {
                    Ok(wrapper) => {
                        if let Some(underlying) = self
                            .read_addr(gateway, wrapper, CallSpec::DepositToken)
                            .await
                        {
                            match self.factory.resolve(underlying, InterfaceKind::Erc20) {
                                Ok(binding) => {
                                    self.state.set_compounded_slot(BindingSlot::Ready(binding));
                                }
                                Err(error) => {
                                    self.state.set_compounded_slot(BindingSlot::Failed);
                                    self.report_resolve("resolve_compounded_token", &error);
                                }
                            }
                        }
                    }
                    Err(error) => {
                        self.state.set_compounded_slot(BindingSlot::Failed);
                        self.report_resolve("resolve_compounded_wrapper", &error);
                    }
                }
            }
        }
    }

    /// Resolve identity metadata once: token name and symbol, the seed
    /// per-share rate, the reward symbol, and the optional compounded
    /// symbol. Stored only when every piece succeeds, so a partial failure
    /// retries the whole stage next cycle.
    async fn resolve_metadata<G: CallGateway>(&self, gateway: &G) {
        if self.state.metadata_resolved() {
            return;
        }
        let Some(token) = self.state.token_slot().binding() else {
            return;
        };
        let Some(reward) = self.state.reward_slot().binding() else {
            return;
        };
        // An unresolved hop still has a retry ahead of it; wait for the
        // slot to become ready or permanently failed.
        if self.descriptor.compounded_symbol_hop && self.state.compounded_slot().is_unresolved() {
            return;
        }

        let one_share = self.descriptor.one_share();
        let (name, symbol, seed_rate, reward_symbol) = tokio::join!(
            self.read_text(gateway, token, CallSpec::Name),
            self.read_text(gateway, token, CallSpec::Symbol),
            self.read_uint(gateway, self.farm, CallSpec::UnderlyingForShares(one_share)),
            self.read_text(gateway, reward, CallSpec::Symbol),
        );
        let compounded_symbol = match self.state.compounded_slot().binding() {
            Some(binding) => match self.read_text(gateway, binding, CallSpec::Symbol).await {
                Some(symbol) => Some(symbol),
                None => return,
            },
            None => None,
        };
        let (Some(name), Some(symbol), Some(seed_rate), Some(reward_symbol)) =
            (name, symbol, seed_rate, reward_symbol)
        else {
            return;
        };

        self.state.set_metadata(TokenMetadata {
            address: token.address,
            name,
            symbol,
            decimals: self.descriptor.token_decimals,
            tokens_per_share: seed_rate,
            compounded_symbol,
        });

        // Seed the snapshot pieces that come from metadata resolution: the
        // reward entry list and the initial rate.
        let mut snapshot = self.state.snapshot();
        if snapshot.rewards.is_empty() {
            snapshot
                .rewards
                .push(RewardEntry::new(reward.address, reward_symbol));
        }
        if snapshot.tokens_per_share.is_none() {
            snapshot.tokens_per_share = Some(seed_rate);
        }
        self.state.publish(snapshot);
        debug!(farm = %self.descriptor.name, "token metadata resolved");
    }

    /// The per-cycle read fan-out. Every read lands in its own field or
    /// not at all; user-specific reads are skipped quietly when no wallet
    /// account is connected.
    async fn collect_reads<G: CallGateway>(&self, gateway: &G) -> CycleReads {
        let account = self.signer.account();
        let token = self.state.token_slot().binding();
        let reward_tokens: Vec<Address> = self
            .state
            .snapshot()
            .rewards
            .iter()
            .map(|entry| entry.token)
            .collect();

        let balance = async {
            match (account, token) {
                (Some(owner), Some(binding)) => {
                    self.read_uint(gateway, binding, CallSpec::BalanceOf(owner))
                        .await
                }
                (None, _) => {
                    self.state.stats.record_reads_skipped(1);
                    None
                }
                (Some(_), None) => None,
            }
        };
        let allowance = async {
            match (account, token) {
                (Some(owner), Some(binding)) => {
                    self.read_uint(
                        gateway,
                        binding,
                        CallSpec::Allowance {
                            owner,
                            spender: self.descriptor.farm_address,
                        },
                    )
                    .await
                }
                (None, _) => {
                    self.state.stats.record_reads_skipped(1);
                    None
                }
                (Some(_), None) => None,
            }
        };
        let position = self.collect_position(gateway, account);
        let total_staked = self.read_uint(gateway, self.farm, CallSpec::TotalStaked);
        let rate = async {
            match self.descriptor.per_share_refresh {
                PerShareRefresh::EveryCycle => {
                    self.read_uint(
                        gateway,
                        self.farm,
                        CallSpec::UnderlyingForShares(self.descriptor.one_share()),
                    )
                    .await
                }
                PerShareRefresh::Once => None,
            }
        };
        let rewards = async {
            let mut availability = Vec::with_capacity(reward_tokens.len());
            for reward_token in &reward_tokens {
                let value = match account {
                    Some(farmer) => {
                        self.read_uint(
                            gateway,
                            self.farm,
                            CallSpec::AvailableRewards {
                                farmer,
                                token: *reward_token,
                            },
                        )
                        .await
                    }
                    None => {
                        self.state.stats.record_reads_skipped(1);
                        None
                    }
                };
                availability.push(value);
            }
            availability
        };

        let (token_balance, allowance, position, total_staked, tokens_per_share, reward_available) =
            tokio::join!(balance, allowance, position, total_staked, rate, rewards);

        CycleReads {
            token_balance,
            allowance,
            staked_balance: position.staked,
            last_deposit_time: position.last_deposit_time,
            unlock_time: position.unlock_time,
            share_balance: position.share_balance,
            underlying_balance: position.underlying_balance,
            total_staked,
            tokens_per_share,
            reward_available,
        }
    }

    /// The accounting-shape-specific position read.
    async fn collect_position<G: CallGateway>(
        &self,
        gateway: &G,
        account: Option<Address>,
    ) -> PositionReads {
        let mut position = PositionReads::default();
        let Some(farmer) = account else {
            self.state.stats.record_reads_skipped(1);
            return position;
        };
        match self.descriptor.accounting {
            StakeAccounting::FarmerInfo => {
                if let Some(info) = self
                    .read_position(gateway, self.farm, CallSpec::FarmerInfo(farmer))
                    .await
                {
                    position.staked = Some(info.staked);
                    position.last_deposit_time = Some(info.last_deposit_time);
                    position.unlock_time = Some(info.unlock_time);
                }
            }
            StakeAccounting::Shares => {
                let Some(shares_binding) = self.state.shares_slot().binding() else {
                    return position;
                };
                let Some(shares) = self
                    .read_uint(gateway, shares_binding, CallSpec::BalanceOf(farmer))
                    .await
                else {
                    return position;
                };
                position.share_balance = Some(shares);
                // Dependent read: the backing value of exactly those shares.
                if let Some(underlying) = self
                    .read_uint(gateway, self.farm, CallSpec::UnderlyingForShares(shares))
                    .await
                {
                    position.underlying_balance = Some(underlying);
                    position.staked = Some(underlying);
                }
            }
        }
        position
    }

    async fn read_uint<G: CallGateway>(
        &self,
        gateway: &G,
        binding: ContractBinding,
        spec: CallSpec,
    ) -> Option<U256> {
        let operation = spec.name();
        match gateway
            .read(binding, spec)
            .await
            .and_then(CallValue::into_uint)
        {
            Ok(value) => Some(value),
            Err(error) => {
                self.report_read(operation, &error);
                None
            }
        }
    }

    async fn read_text<G: CallGateway>(
        &self,
        gateway: &G,
        binding: ContractBinding,
        spec: CallSpec,
    ) -> Option<String> {
        let operation = spec.name();
        match gateway
            .read(binding, spec)
            .await
            .and_then(CallValue::into_text)
        {
            Ok(value) => Some(value),
            Err(error) => {
                self.report_read(operation, &error);
                None
            }
        }
    }

    async fn read_addr<G: CallGateway>(
        &self,
        gateway: &G,
        binding: ContractBinding,
        spec: CallSpec,
    ) -> Option<Address> {
        let operation = spec.name();
        match gateway
            .read(binding, spec)
            .await
            .and_then(CallValue::into_addr)
        {
            Ok(value) => Some(value),
            Err(error) => {
                self.report_read(operation, &error);
                None
            }
        }
    }

    async fn read_position<G: CallGateway>(
        &self,
        gateway: &G,
        binding: ContractBinding,
        spec: CallSpec,
    ) -> Option<PositionInfo> {
        let operation = spec.name();
        match gateway
            .read(binding, spec)
            .await
            .and_then(CallValue::into_position)
        {
            Ok(value) => Some(value),
            Err(error) => {
                self.report_read(operation, &error);
                None
            }
        }
    }

    fn report_read(&self, operation: &'static str, error: &CallError) {
        self.state.stats.record_read_failure();
        self.diagnostics.emit(DiagnosticRecord {
            farm: self.descriptor.name.clone(),
            operation,
            cause: error.to_string(),
        });
    }

    fn report_resolve(&self, operation: &'static str, error: &ResolveError) {
        self.diagnostics.emit(DiagnosticRecord {
            farm: self.descriptor.name.clone(),
            operation,
            cause: error.to_string(),
        });
    }
}
