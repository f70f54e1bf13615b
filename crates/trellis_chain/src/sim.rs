//! # Simulated Ledger
//!
//! A deterministic in-memory ledger implementing the gateway, submitter and
//! factory traits. Tests and demo binaries run the full engine against it;
//! nothing here ever touches a network.
//!
//! The simulator keeps real bookkeeping (balances move, allowances gate
//! stakes, locks stamp timestamps) so engine-level properties hold against
//! it for the same reasons they hold on-chain. Fault injection covers the
//! failure paths: per-operation read failures, dispatch rejection, revert on
//! confirmation, and artificial latency for overlap tests.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use alloy_primitives::{Address, B256, U256};
use parking_lot::Mutex;

use crate::binding::{ContractBinding, InterfaceKind};
use crate::calls::{
    CallSpec, CallValue, PositionInfo, Settlement, TransactionKind, TransactionRequest, TxHandle,
};
use crate::error::{CallError, ResolveError, SubmitError};
use crate::traits::{BindingFactory, CallGateway, TransactionSubmitter, WalletSigner};

/// One simulated ERC-20.
#[derive(Clone, Debug)]
struct SimToken {
    name: String,
    symbol: String,
    decimals: u8,
    total_supply: U256,
    balances: HashMap<Address, U256>,
    allowances: HashMap<(Address, Address), U256>,
    /// Underlying asset for wrapper tokens that answer `depositToken()`.
    deposit_token: Option<Address>,
}

/// One simulated staking farm.
#[derive(Clone, Debug)]
struct SimFarm {
    staked_token: Address,
    reward_tokens: Vec<Address>,
    /// Deposit tokens backing one whole share, scaled by `10^share_decimals`.
    tokens_per_share: U256,
    share_decimals: u8,
    lock_secs: u64,
    total_staked: U256,
    stakes: HashMap<Address, SimStake>,
    pending_rewards: HashMap<(Address, Address), U256>,
}

#[derive(Clone, Copy, Debug, Default)]
struct SimStake {
    amount: U256,
    last_deposit_time: u64,
    unlock_time: u64,
}

/// Registration spec for a simulated farm.
#[derive(Clone, Debug)]
pub struct SimFarmSpec {
    /// Farm contract address.
    pub address: Address,
    /// Token accepted for staking.
    pub staked_token: Address,
    /// Reward tokens, in contract order.
    pub reward_tokens: Vec<Address>,
    /// Deposit tokens per whole share, scaled by `10^share_decimals`.
    pub tokens_per_share: U256,
    /// Share scale.
    pub share_decimals: u8,
    /// Lock window applied on every deposit.
    pub lock_secs: u64,
}

impl SimFarmSpec {
    /// A farm with a 1:1 share rate and no lock.
    #[must_use]
    pub fn new(address: Address, staked_token: Address, share_decimals: u8) -> Self {
        Self {
            address,
            staked_token,
            reward_tokens: Vec::new(),
            tokens_per_share: pow10(share_decimals),
            share_decimals,
            lock_secs: 0,
        }
    }

    /// Adds a reward token.
    #[must_use]
    pub fn with_reward(mut self, token: Address) -> Self {
        self.reward_tokens.push(token);
        self
    }

    /// Sets the share rate (deposit tokens backing one whole share).
    #[must_use]
    pub fn with_tokens_per_share(mut self, rate: U256) -> Self {
        self.tokens_per_share = rate;
        self
    }

    /// Sets the deposit lock window.
    #[must_use]
    pub fn with_lock(mut self, lock_secs: u64) -> Self {
        self.lock_secs = lock_secs;
        self
    }
}

#[derive(Debug, Default)]
struct FaultPlan {
    /// Operation name -> remaining injected failures.
    fail_reads: HashMap<&'static str, u32>,
    read_delay: Option<Duration>,
    confirm_delay: Option<Duration>,
    reject_next_dispatch: Option<String>,
    revert_next_confirm: Option<String>,
}

#[derive(Debug)]
struct LedgerInner {
    clock: u64,
    active_account: Option<Address>,
    tokens: HashMap<Address, SimToken>,
    farms: HashMap<Address, SimFarm>,
    tx_counter: u64,
    pending: HashMap<B256, (Address, TransactionRequest)>,
    dispatched: Vec<TransactionRequest>,
    read_counts: HashMap<&'static str, u64>,
    faults: FaultPlan,
}

fn pow10(decimals: u8) -> U256 {
    U256::from(10u8).pow(U256::from(decimals))
}

fn epoch_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

impl LedgerInner {
    fn new() -> Self {
        Self {
            clock: epoch_now(),
            active_account: None,
            tokens: HashMap::new(),
            farms: HashMap::new(),
            tx_counter: 0,
            pending: HashMap::new(),
            dispatched: Vec::new(),
            read_counts: HashMap::new(),
            faults: FaultPlan::default(),
        }
    }

    fn token(&self, address: Address) -> Result<&SimToken, CallError> {
        self.tokens
            .get(&address)
            .ok_or(CallError::Unavailable("token"))
    }

    fn farm(&self, address: Address) -> Result<&SimFarm, CallError> {
        self.farms
            .get(&address)
            .ok_or(CallError::Unavailable("farm"))
    }

    fn serve(&mut self, binding: ContractBinding, spec: CallSpec) -> Result<CallValue, CallError> {
        let operation = spec.name();
        *self.read_counts.entry(operation).or_insert(0) += 1;

        if let Some(remaining) = self.faults.fail_reads.get_mut(operation) {
            *remaining -= 1;
            if *remaining == 0 {
                self.faults.fail_reads.remove(operation);
            }
            return Err(CallError::Transport {
                operation,
                reason: "injected fault".into(),
            });
        }

        match spec {
            CallSpec::Name => Ok(CallValue::Text(self.token(binding.address)?.name.clone())),
            CallSpec::Symbol => Ok(CallValue::Text(self.token(binding.address)?.symbol.clone())),
            CallSpec::Decimals => Ok(CallValue::Byte(self.token(binding.address)?.decimals)),
            CallSpec::TotalSupply => Ok(CallValue::Uint(self.token(binding.address)?.total_supply)),
            CallSpec::BalanceOf(account) => Ok(CallValue::Uint(
                self.token(binding.address)?
                    .balances
                    .get(&account)
                    .copied()
                    .unwrap_or(U256::ZERO),
            )),
            CallSpec::Allowance { owner, spender } => Ok(CallValue::Uint(
                self.token(binding.address)?
                    .allowances
                    .get(&(owner, spender))
                    .copied()
                    .unwrap_or(U256::ZERO),
            )),
            CallSpec::StakedToken => {
                Ok(CallValue::Addr(self.farm(binding.address)?.staked_token))
            }
            CallSpec::DepositToken => {
                // Farms answer with their staked token; wrapper tokens with
                // their underlying asset.
                if let Some(farm) = self.farms.get(&binding.address) {
                    return Ok(CallValue::Addr(farm.staked_token));
                }
                self.token(binding.address)?
                    .deposit_token
                    .map(CallValue::Addr)
                    .ok_or(CallError::Unavailable("depositToken"))
            }
            CallSpec::RewardTokenAt(index) => self
                .farm(binding.address)?
                .reward_tokens
                .get(index)
                .copied()
                .map(CallValue::Addr)
                .ok_or(CallError::Unavailable("rewardTokens")),
            CallSpec::RewardToken => self
                .farm(binding.address)?
                .reward_tokens
                .first()
                .copied()
                .map(CallValue::Addr)
                .ok_or(CallError::Unavailable("rewardToken")),
            CallSpec::FarmerInfo(account) => {
                let stake = self
                    .farm(binding.address)?
                    .stakes
                    .get(&account)
                    .copied()
                    .unwrap_or_default();
                Ok(CallValue::Position(PositionInfo {
                    staked: stake.amount,
                    last_deposit_time: stake.last_deposit_time,
                    unlock_time: stake.unlock_time,
                }))
            }
            CallSpec::TotalStaked => Ok(CallValue::Uint(self.farm(binding.address)?.total_staked)),
            CallSpec::AvailableRewards { farmer, token } => Ok(CallValue::Uint(
                self.farm(binding.address)?
                    .pending_rewards
                    .get(&(farmer, token))
                    .copied()
                    .unwrap_or(U256::ZERO),
            )),
            CallSpec::UnderlyingForShares(shares) => {
                let farm = self.farm(binding.address)?;
                shares
                    .checked_mul(farm.tokens_per_share)
                    .map(|scaled| scaled / pow10(farm.share_decimals))
                    .map(CallValue::Uint)
                    .ok_or(CallError::Transport {
                        operation: "getDepositTokensForShares",
                        reason: "share conversion overflow".into(),
                    })
            }
        }
    }

    fn apply(&mut self, from: Address, request: &TransactionRequest) -> Result<(), String> {
        match request.kind {
            TransactionKind::Approve => {
                let Some(spender) = request.spender else {
                    return Err("approve without spender".into());
                };
                let amount = request.payload.unwrap_or(U256::MAX);
                let token = self
                    .tokens
                    .get_mut(&request.target.address)
                    .ok_or("unknown token")?;
                token.allowances.insert((from, spender), amount);
                Ok(())
            }
            TransactionKind::Stake => {
                let amount = request.payload.ok_or("stake without amount")?;
                if amount.is_zero() {
                    return Err("zero stake".into());
                }
                let farm_address = request.target.address;
                let (staked_token, lock_secs) = {
                    let farm = self.farms.get(&farm_address).ok_or("unknown farm")?;
                    (farm.staked_token, farm.lock_secs)
                };
                let token = self.tokens.get_mut(&staked_token).ok_or("unknown token")?;
                let allowance = token
                    .allowances
                    .get(&(from, farm_address))
                    .copied()
                    .unwrap_or(U256::ZERO);
                if allowance < amount {
                    return Err("insufficient allowance".into());
                }
                let balance = token.balances.entry(from).or_insert(U256::ZERO);
                if *balance < amount {
                    return Err("insufficient balance".into());
                }
                *balance -= amount;
                if allowance != U256::MAX {
                    token.allowances.insert((from, farm_address), allowance - amount);
                }
                let clock = self.clock;
                let farm = self.farms.get_mut(&farm_address).ok_or("unknown farm")?;
                let stake = farm.stakes.entry(from).or_default();
                stake.amount += amount;
                stake.last_deposit_time = clock;
                stake.unlock_time = clock + lock_secs;
                farm.total_staked += amount;
                Ok(())
            }
            TransactionKind::Withdraw => {
                let farm_address = request.target.address;
                let (staked_token, amount) = {
                    let farm = self.farms.get_mut(&farm_address).ok_or("unknown farm")?;
                    let stake = farm.stakes.entry(from).or_default();
                    if stake.amount.is_zero() {
                        return Err("nothing staked".into());
                    }
                    let amount = stake.amount;
                    *stake = SimStake::default();
                    farm.total_staked -= amount;
                    (farm.staked_token, amount)
                };
                let token = self.tokens.get_mut(&staked_token).ok_or("unknown token")?;
                *token.balances.entry(from).or_insert(U256::ZERO) += amount;
                Ok(())
            }
            TransactionKind::Claim => {
                let farm_address = request.target.address;
                let payouts: Vec<(Address, U256)> = {
                    let farm = self.farms.get_mut(&farm_address).ok_or("unknown farm")?;
                    let reward_tokens = farm.reward_tokens.clone();
                    reward_tokens
                        .into_iter()
                        .map(|token| {
                            let owed = farm
                                .pending_rewards
                                .insert((from, token), U256::ZERO)
                                .unwrap_or(U256::ZERO);
                            (token, owed)
                        })
                        .collect()
                };
                for (token_address, owed) in payouts {
                    if owed.is_zero() {
                        continue;
                    }
                    let token = self
                        .tokens
                        .get_mut(&token_address)
                        .ok_or("unknown reward token")?;
                    *token.balances.entry(from).or_insert(U256::ZERO) += owed;
                }
                Ok(())
            }
            TransactionKind::Compound => {
                let clock = self.clock;
                let farm_address = request.target.address;
                let farm = self.farms.get_mut(&farm_address).ok_or("unknown farm")?;
                let Some(reward_token) = farm.reward_tokens.first().copied() else {
                    return Err("farm has no reward token".into());
                };
                let owed = farm
                    .pending_rewards
                    .insert((from, reward_token), U256::ZERO)
                    .unwrap_or(U256::ZERO);
                if owed.is_zero() {
                    return Ok(());
                }
                let lock_secs = farm.lock_secs;
                let stake = farm.stakes.entry(from).or_default();
                stake.amount += owed;
                stake.last_deposit_time = clock;
                stake.unlock_time = clock + lock_secs;
                farm.total_staked += owed;
                Ok(())
            }
        }
    }
}

/// The simulated ledger handle. Clones share one ledger.
#[derive(Clone)]
pub struct SimLedger {
    inner: Arc<Mutex<LedgerInner>>,
}

impl Default for SimLedger {
    fn default() -> Self {
        Self::new()
    }
}

impl SimLedger {
    /// An empty ledger whose clock starts at the real epoch time.
    #[must_use]
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Mutex::new(LedgerInner::new())),
        }
    }

    // ------------------------------------------------------------------
    // Registration
    // ------------------------------------------------------------------

    /// Registers an ERC-20.
    pub fn register_token(&self, address: Address, name: &str, symbol: &str, decimals: u8) {
        self.inner.lock().tokens.insert(
            address,
            SimToken {
                name: name.into(),
                symbol: symbol.into(),
                decimals,
                total_supply: U256::ZERO,
                balances: HashMap::new(),
                allowances: HashMap::new(),
                deposit_token: None,
            },
        );
    }

    /// Marks a registered token as a wrapper over an underlying asset.
    pub fn set_deposit_token(&self, wrapper: Address, underlying: Address) {
        if let Some(token) = self.inner.lock().tokens.get_mut(&wrapper) {
            token.deposit_token = Some(underlying);
        }
    }

    /// Mints tokens to an account, growing total supply.
    pub fn mint(&self, token: Address, account: Address, amount: U256) {
        if let Some(token) = self.inner.lock().tokens.get_mut(&token) {
            *token.balances.entry(account).or_insert(U256::ZERO) += amount;
            token.total_supply += amount;
        }
    }

    /// Registers a farm.
    pub fn register_farm(&self, spec: SimFarmSpec) {
        self.inner.lock().farms.insert(
            spec.address,
            SimFarm {
                staked_token: spec.staked_token,
                reward_tokens: spec.reward_tokens,
                tokens_per_share: spec.tokens_per_share,
                share_decimals: spec.share_decimals,
                lock_secs: spec.lock_secs,
                total_staked: U256::ZERO,
                stakes: HashMap::new(),
                pending_rewards: HashMap::new(),
            },
        );
    }

    /// Sets the pending reward owed to an account.
    pub fn set_pending_reward(&self, farm: Address, account: Address, token: Address, amount: U256) {
        if let Some(farm) = self.inner.lock().farms.get_mut(&farm) {
            farm.pending_rewards.insert((account, token), amount);
        }
    }

    /// Updates a farm's share rate (autocompounding drift).
    pub fn set_tokens_per_share(&self, farm: Address, rate: U256) {
        if let Some(farm) = self.inner.lock().farms.get_mut(&farm) {
            farm.tokens_per_share = rate;
        }
    }

    /// Connects or disconnects the active account.
    pub fn set_account(&self, account: Option<Address>) {
        self.inner.lock().active_account = account;
    }

    // ------------------------------------------------------------------
    // Clock
    // ------------------------------------------------------------------

    /// Current ledger time in epoch seconds.
    #[must_use]
    pub fn now(&self) -> u64 {
        self.inner.lock().clock
    }

    /// Advances the ledger clock.
    pub fn advance_clock(&self, secs: u64) {
        self.inner.lock().clock += secs;
    }

    // ------------------------------------------------------------------
    // Fault injection
    // ------------------------------------------------------------------

    /// Fails the next read of the named operation, once.
    pub fn fail_next_read(&self, operation: &'static str) {
        *self
            .inner
            .lock()
            .faults
            .fail_reads
            .entry(operation)
            .or_insert(0) += 1;
    }

    /// Applies artificial latency to every read.
    pub fn set_read_delay(&self, delay: Option<Duration>) {
        self.inner.lock().faults.read_delay = delay;
    }

    /// Applies artificial latency to every confirmation.
    pub fn set_confirm_delay(&self, delay: Option<Duration>) {
        self.inner.lock().faults.confirm_delay = delay;
    }

    /// Rejects the next dispatch before it enters the pool.
    pub fn reject_next_dispatch(&self, reason: &str) {
        self.inner.lock().faults.reject_next_dispatch = Some(reason.into());
    }

    /// Reverts the next confirmation.
    pub fn revert_next_confirm(&self, reason: &str) {
        self.inner.lock().faults.revert_next_confirm = Some(reason.into());
    }

    // ------------------------------------------------------------------
    // Assertion helpers
    // ------------------------------------------------------------------

    /// How many times the named read was attempted.
    #[must_use]
    pub fn read_count(&self, operation: &'static str) -> u64 {
        self.inner
            .lock()
            .read_counts
            .get(operation)
            .copied()
            .unwrap_or(0)
    }

    /// How many writes were dispatched in total.
    #[must_use]
    pub fn dispatch_count(&self) -> usize {
        self.inner.lock().dispatched.len()
    }

    /// How many writes of one kind were dispatched.
    #[must_use]
    pub fn dispatch_count_of(&self, kind: TransactionKind) -> usize {
        self.inner
            .lock()
            .dispatched
            .iter()
            .filter(|request| request.kind == kind)
            .count()
    }

    /// Balance of an account.
    #[must_use]
    pub fn balance_of(&self, token: Address, account: Address) -> U256 {
        self.inner
            .lock()
            .tokens
            .get(&token)
            .and_then(|t| t.balances.get(&account).copied())
            .unwrap_or(U256::ZERO)
    }

    /// Allowance granted by an owner to a spender.
    #[must_use]
    pub fn allowance_of(&self, token: Address, owner: Address, spender: Address) -> U256 {
        self.inner
            .lock()
            .tokens
            .get(&token)
            .and_then(|t| t.allowances.get(&(owner, spender)).copied())
            .unwrap_or(U256::ZERO)
    }

    /// Staked amount of an account.
    #[must_use]
    pub fn staked_of(&self, farm: Address, account: Address) -> U256 {
        self.inner
            .lock()
            .farms
            .get(&farm)
            .and_then(|f| f.stakes.get(&account).map(|s| s.amount))
            .unwrap_or(U256::ZERO)
    }

    /// Pending reward owed to an account.
    #[must_use]
    pub fn pending_reward_of(&self, farm: Address, account: Address, token: Address) -> U256 {
        self.inner
            .lock()
            .farms
            .get(&farm)
            .and_then(|f| f.pending_rewards.get(&(account, token)).copied())
            .unwrap_or(U256::ZERO)
    }
}

impl CallGateway for SimLedger {
    async fn read(
        &self,
        binding: ContractBinding,
        spec: CallSpec,
    ) -> Result<CallValue, CallError> {
        let delay = self.inner.lock().faults.read_delay;
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        self.inner.lock().serve(binding, spec)
    }
}

impl TransactionSubmitter for SimLedger {
    async fn dispatch(&self, request: &TransactionRequest) -> Result<TxHandle, SubmitError> {
        let mut inner = self.inner.lock();
        let Some(from) = inner.active_account else {
            return Err(SubmitError::SignerAbsent);
        };
        if let Some(reason) = inner.faults.reject_next_dispatch.take() {
            return Err(SubmitError::Rejected(reason));
        }
        inner.dispatched.push(request.clone());
        inner.tx_counter += 1;
        let handle = TxHandle(B256::from(U256::from(inner.tx_counter).to_be_bytes::<32>()));
        inner.pending.insert(handle.0, (from, request.clone()));
        Ok(handle)
    }

    async fn confirm(&self, handle: TxHandle) -> Settlement {
        let delay = self.inner.lock().faults.confirm_delay;
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        let mut inner = self.inner.lock();
        let Some((from, request)) = inner.pending.remove(&handle.0) else {
            return Settlement::Reverted {
                handle,
                reason: "unknown transaction".into(),
            };
        };
        if let Some(reason) = inner.faults.revert_next_confirm.take() {
            return Settlement::Reverted { handle, reason };
        }
        match inner.apply(from, &request) {
            Ok(()) => Settlement::Confirmed { handle },
            Err(reason) => Settlement::Reverted { handle, reason },
        }
    }
}

impl BindingFactory for SimLedger {
    fn resolve(
        &self,
        address: Address,
        interface: InterfaceKind,
    ) -> Result<ContractBinding, ResolveError> {
        if address == Address::ZERO {
            return Err(ResolveError::ZeroAddress);
        }
        let inner = self.inner.lock();
        let available = match interface {
            InterfaceKind::Erc20 => inner.tokens.contains_key(&address),
            InterfaceKind::StrategyFarm => {
                inner.farms.contains_key(&address)
                    || inner
                        .tokens
                        .get(&address)
                        .is_some_and(|t| t.deposit_token.is_some())
            }
        };
        if available {
            Ok(ContractBinding::new(address, interface))
        } else {
            Err(ResolveError::Unavailable {
                interface: interface.name(),
                address: address.to_string(),
            })
        }
    }
}

impl WalletSigner for SimLedger {
    fn account(&self) -> Option<Address> {
        self.inner.lock().active_account
    }
}
