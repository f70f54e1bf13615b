//! # Farm View Models
//!
//! One parametrized aggregate per mounted farm. The deployed dashboards
//! had a near-identical view per farm variant; here a single
//! [`FarmViewModel`] is driven entirely by its [`FarmDescriptor`], so a new
//! farm shape is a config entry, not a fork of the view code.
//!
//! Mounting resolves the farm binding, wires the coordinator and the
//! orchestrator to shared state, and spawns the lifecycle task: an
//! immediate bootstrap cycle, then fixed-cadence polling with the
//! overlap-skip guard, plus out-of-cycle refreshes after transactions.
//! Teardown is idempotent and guarantees no snapshot mutation afterwards.

use std::sync::Arc;
use std::time::Duration;

use alloy_primitives::U256;
use parking_lot::Mutex;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::info;

use trellis_chain::{
    format_units, parse_units, AggregateStatsSource, BindingFactory, CallGateway, InterfaceKind,
    NotificationSink, TransactionSubmitter, WalletSigner,
};

use crate::config::NotificationTimings;
use crate::countdown::{TimeParts, UnlockCountdown};
use crate::descriptor::{FarmDescriptor, StatsKey};
use crate::diagnostics::DiagnosticsHub;
use crate::error::{EngineError, EngineResult};
use crate::fetch::FetchCoordinator;
use crate::orchestrator::{FarmAction, TransactionOrchestrator, TxOutcome};
use crate::scheduler::{RefreshScheduler, SchedulerState};
use crate::snapshot::{FarmSnapshot, SyncedFarmState, TokenMetadata};
use crate::stats::SyncStatsSnapshot;

/// Everything a view needs from the outside world.
///
/// The same environment mounts every farm on the dashboard; the gateway
/// and submitter are cloned per view, the rest is shared behind `Arc`s.
#[derive(Clone)]
pub struct FarmEnvironment<G, S> {
    /// Read access to the chain.
    pub gateway: G,
    /// Write access to the chain, via the user's wallet.
    pub submitter: S,
    /// Resolves contract addresses into typed bindings.
    pub factory: Arc<dyn BindingFactory>,
    /// The connected wallet, if any.
    pub signer: Arc<dyn WalletSigner>,
    /// Where transaction toasts go.
    pub notifications: Arc<dyn NotificationSink>,
    /// Protocol-wide APY / TVL feed.
    pub stats_feed: Arc<dyn AggregateStatsSource>,
    /// Dashboard-wide diagnostics channel.
    pub diagnostics: DiagnosticsHub,
    /// Notification auto-dismiss windows.
    pub timings: NotificationTimings,
}

/// The live view of one farm: state, refresh lifecycle, transactions,
/// countdown, and presentation accessors.
pub struct FarmViewModel<G, S> {
    descriptor: FarmDescriptor,
    environment: FarmEnvironment<G, S>,
    state: Arc<SyncedFarmState>,
    scheduler: Arc<RefreshScheduler>,
    orchestrator: TransactionOrchestrator,
    lifecycle: JoinHandle<()>,
    countdown: Mutex<Option<UnlockCountdown>>,
}

impl<G, S> FarmViewModel<G, S>
where
    G: CallGateway + Clone + 'static,
    S: TransactionSubmitter,
{
    /// Resolve the farm binding, wire the collaborators, and start the
    /// refresh lifecycle.
    ///
    /// # Errors
    /// [`EngineError::FarmBinding`] when the configured farm address does
    /// not resolve as a strategy farm.
    pub fn mount(
        descriptor: FarmDescriptor,
        environment: FarmEnvironment<G, S>,
    ) -> EngineResult<Self> {
        let farm = environment
            .factory
            .resolve(descriptor.farm_address, InterfaceKind::StrategyFarm)
            .map_err(|source| EngineError::FarmBinding {
                farm: descriptor.name.clone(),
                source,
            })?;

        let state = Arc::new(SyncedFarmState::new());
        let scheduler = Arc::new(RefreshScheduler::new());
        let coordinator = Arc::new(FetchCoordinator::new(
            descriptor.clone(),
            farm,
            Arc::clone(&state),
            Arc::clone(&environment.factory),
            Arc::clone(&environment.signer),
            environment.diagnostics.clone(),
        ));
        let orchestrator = TransactionOrchestrator::new(
            descriptor.clone(),
            farm,
            Arc::clone(&state),
            Arc::clone(&scheduler),
            Arc::clone(&environment.signer),
            Arc::clone(&environment.notifications),
            environment.timings,
        );

        // Zero-period configs clamp to one second rather than panicking
        // inside the timer.
        let period = Duration::from_secs(descriptor.poll_period_secs.max(1));
        let lifecycle = tokio::spawn(lifecycle_loop(
            coordinator,
            Arc::clone(&scheduler),
            Arc::clone(&state),
            environment.gateway.clone(),
            period,
        ));
        info!(farm = %descriptor.name, "view mounted");

        Ok(Self {
            descriptor,
            environment,
            state,
            scheduler,
            orchestrator,
            lifecycle,
            countdown: Mutex::new(None),
        })
    }

    // ------------------------------------------------------------------
    // Actions
    // ------------------------------------------------------------------

    /// Grant the farm an unlimited allowance.
    pub async fn approve(&self) -> TxOutcome {
        self.orchestrator
            .execute(&self.environment.submitter, FarmAction::Approve)
            .await
    }

    /// Stake the typed amount. Routed to approve while the gate is closed.
    pub async fn deposit(&self, amount: &str) -> TxOutcome {
        self.orchestrator
            .execute(
                &self.environment.submitter,
                FarmAction::Deposit {
                    amount: amount.to_owned(),
                },
            )
            .await
    }

    /// Withdraw the entire stake.
    pub async fn withdraw(&self) -> TxOutcome {
        self.orchestrator
            .execute(&self.environment.submitter, FarmAction::Withdraw)
            .await
    }

    /// Withdraw a typed amount, refused unless it is the full stake.
    pub async fn withdraw_exact(&self, amount: &str) -> TxOutcome {
        self.orchestrator
            .execute(
                &self.environment.submitter,
                FarmAction::WithdrawExact {
                    amount: amount.to_owned(),
                },
            )
            .await
    }

    /// Claim all pending rewards.
    pub async fn claim(&self) -> TxOutcome {
        self.orchestrator
            .execute(&self.environment.submitter, FarmAction::Claim)
            .await
    }

    /// Compound pending rewards into the stake.
    pub async fn compound(&self) -> TxOutcome {
        self.orchestrator
            .execute(&self.environment.submitter, FarmAction::Compound)
            .await
    }
}

impl<G, S> FarmViewModel<G, S> {
    /// Ask for a refresh outside the polling cadence.
    pub fn refresh_now(&self) {
        self.scheduler.request_refresh();
    }

    // ------------------------------------------------------------------
    // Presentation accessors
    // ------------------------------------------------------------------

    /// The descriptor this view was mounted with.
    #[must_use]
    pub fn descriptor(&self) -> &FarmDescriptor {
        &self.descriptor
    }

    /// Clone of the current snapshot.
    #[must_use]
    pub fn snapshot(&self) -> FarmSnapshot {
        self.state.snapshot()
    }

    /// Clone of the resolved token metadata, if any.
    #[must_use]
    pub fn metadata(&self) -> Option<TokenMetadata> {
        self.state.metadata()
    }

    /// Current scheduler lifecycle state.
    #[must_use]
    pub fn scheduler_state(&self) -> SchedulerState {
        self.scheduler.state()
    }

    /// The scheduler, for cadence counters.
    #[must_use]
    pub fn scheduler(&self) -> &RefreshScheduler {
        &self.scheduler
    }

    /// Counters for this view.
    #[must_use]
    pub fn stats(&self) -> SyncStatsSnapshot {
        self.state.stats.snapshot()
    }

    /// Format an optional raw amount at the staked token's decimals.
    fn format_token(&self, value: Option<U256>) -> Option<String> {
        value.map(|value| format_units(value, self.descriptor.token_decimals))
    }

    /// Wallet balance formatted at the staked token's decimals.
    #[must_use]
    pub fn display_token_balance(&self) -> Option<String> {
        self.format_token(self.state.snapshot().token_balance)
    }

    /// Staked balance formatted at the staked token's decimals.
    #[must_use]
    pub fn display_staked_balance(&self) -> Option<String> {
        self.format_token(self.state.snapshot().staked_balance)
    }

    /// Accrued earnings formatted at the staked token's decimals.
    #[must_use]
    pub fn display_earnings(&self) -> Option<String> {
        let earnings = self
            .state
            .snapshot()
            .earnings(self.descriptor.one_share())?;
        Some(format_units(earnings, self.descriptor.token_decimals))
    }

    /// Reward symbol and formatted availability, per reward entry.
    #[must_use]
    pub fn display_rewards(&self) -> Vec<(String, String)> {
        self.state
            .snapshot()
            .rewards
            .iter()
            .map(|entry| {
                (
                    entry.symbol.clone(),
                    format_units(entry.available, self.descriptor.reward_decimals),
                )
            })
            .collect()
    }

    /// Whether a deposit of the typed amount would pass validation and the
    /// wallet can cover it. Drives the submit button's enabled state.
    #[must_use]
    pub fn can_submit_deposit(&self, amount: &str) -> bool {
        let snapshot = self.state.snapshot();
        if !snapshot.is_initialized || !snapshot.is_approved {
            return false;
        }
        let Ok(value) = parse_units(amount, self.descriptor.token_decimals) else {
            return false;
        };
        value > U256::ZERO && snapshot.token_balance.is_some_and(|balance| value <= balance)
    }

    /// APY in basis points from the aggregate feed, keyed per descriptor.
    #[must_use]
    pub fn apy_bps(&self) -> Option<u64> {
        let stats = self.environment.stats_feed.latest()?;
        match self.descriptor.stats_key {
            StatsKey::Headline => stats.headline_apy_bps,
            StatsKey::Strategy => stats
                .strategy(self.descriptor.farm_address)
                .map(|entry| entry.apy_bps),
        }
    }

    /// Total value staked: the feed's per-strategy figure when present,
    /// otherwise the farm-wide total from the snapshot.
    #[must_use]
    pub fn total_value_staked(&self) -> Option<U256> {
        let from_feed = self
            .environment
            .stats_feed
            .latest()
            .and_then(|stats| {
                stats
                    .strategy(self.descriptor.farm_address)
                    .map(|entry| entry.total_value_staked)
            });
        from_feed.or_else(|| self.state.snapshot().total_staked)
    }

    // ------------------------------------------------------------------
    // Countdown
    // ------------------------------------------------------------------

    /// Start (or restart) the unlock countdown from the snapshot's unlock
    /// timestamp. `None` when no unlock time has been read yet.
    pub fn start_countdown(&self) -> Option<tokio::sync::watch::Receiver<TimeParts>> {
        let unlock = self.state.snapshot().unlock_time?;
        let countdown = UnlockCountdown::start(unlock);
        let receiver = countdown.subscribe();
        if let Some(previous) = self.countdown.lock().replace(countdown) {
            previous.stop();
        }
        Some(receiver)
    }

    /// Stop the countdown, if one is running.
    pub fn stop_countdown(&self) {
        if let Some(countdown) = self.countdown.lock().take() {
            countdown.stop();
        }
    }

    /// The most recently published countdown parts, if one is running.
    #[must_use]
    pub fn countdown_parts(&self) -> Option<TimeParts> {
        self.countdown.lock().as_ref().map(UnlockCountdown::parts)
    }

    // ------------------------------------------------------------------
    // Lifecycle
    // ------------------------------------------------------------------

    /// Shut the view down. Idempotent.
    ///
    /// Marks the shared state torn down (so in-flight cycle results are
    /// discarded), deactivates the scheduler, and aborts the lifecycle and
    /// countdown tasks.
    pub fn teardown(&self) {
        if self.state.is_torn_down() {
            return;
        }
        self.state.mark_torn_down();
        self.scheduler.deactivate();
        self.lifecycle.abort();
        self.stop_countdown();
        info!(farm = %self.descriptor.name, "view torn down");
    }
}

impl<G, S> Drop for FarmViewModel<G, S> {
    fn drop(&mut self) {
        self.teardown();
    }
}

/// The spawned refresh loop. Each admitted cycle runs as its own task so
/// a slow cycle keeps the ticker observable: a tick that lands mid-cycle
/// is counted as a skip instead of queueing behind it.
async fn lifecycle_loop<G>(
    coordinator: Arc<FetchCoordinator>,
    scheduler: Arc<RefreshScheduler>,
    state: Arc<SyncedFarmState>,
    gateway: G,
    period: Duration,
) where
    G: CallGateway + Clone + 'static,
{
    let mut ticker = tokio::time::interval(period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    loop {
        tokio::select! {
            _ = ticker.tick() => {}
            () = scheduler.refresh_requested() => {}
        }
        if state.is_torn_down() {
            break;
        }
        if !scheduler.try_begin_cycle() {
            continue;
        }
        let coordinator = Arc::clone(&coordinator);
        let scheduler = Arc::clone(&scheduler);
        let state = Arc::clone(&state);
        let gateway = gateway.clone();
        tokio::spawn(async move {
            coordinator.run_cycle(&gateway).await;
            if state.snapshot().is_initialized && !state.is_torn_down() {
                scheduler.activate();
            }
            scheduler.finish_cycle();
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy_primitives::Address;
    use trellis_chain::{
        AggregateStats, SimFarmSpec, SimLedger, StaticStatsSource, StrategyStats,
    };

    const FARM: Address = Address::repeat_byte(0xF1);
    const TOKEN: Address = Address::repeat_byte(0x71);
    const REWARD: Address = Address::repeat_byte(0x73);
    const USER: Address = Address::repeat_byte(0xEE);

    fn gwei(value: u64) -> U256 {
        U256::from(value) * U256::from(1_000_000_000u64)
    }

    fn boost_sim() -> SimLedger {
        let sim = SimLedger::new();
        sim.register_token(TOKEN, "Marinated UMAMI", "mUMAMI", 9);
        sim.register_token(REWARD, "Wrapped Ether", "WETH", 18);
        sim.register_farm(
            SimFarmSpec::new(FARM, TOKEN, 9)
                .with_reward(REWARD)
                .with_lock(86_400),
        );
        sim.set_account(Some(USER));
        sim.mint(TOKEN, USER, gwei(500));
        sim
    }

    fn environment(sim: &SimLedger, feed: StaticStatsSource) -> FarmEnvironment<SimLedger, SimLedger> {
        FarmEnvironment {
            gateway: sim.clone(),
            submitter: sim.clone(),
            factory: Arc::new(sim.clone()),
            signer: Arc::new(sim.clone()),
            notifications: Arc::new(trellis_chain::RecordingNotificationSink::new()),
            stats_feed: Arc::new(feed),
            diagnostics: DiagnosticsHub::default(),
            timings: NotificationTimings::default(),
        }
    }

    fn boost_descriptor() -> FarmDescriptor {
        let mut descriptor = FarmDescriptor::autocompounder_boost("mUMAMI Boost", FARM);
        descriptor.compounded_symbol_hop = false;
        descriptor
    }

    async fn wait_until(mut condition: impl FnMut() -> bool) {
        tokio::time::timeout(Duration::from_secs(120), async {
            while !condition() {
                tokio::time::sleep(Duration::from_millis(10)).await;
            }
        })
        .await
        .expect("condition not reached in time");
    }

    #[tokio::test(start_paused = true)]
    async fn mount_bootstraps_and_activates_the_scheduler() {
        let sim = boost_sim();
        let view = FarmViewModel::mount(boost_descriptor(), environment(&sim, StaticStatsSource::empty()))
            .expect("mount");
        assert_eq!(view.scheduler_state(), SchedulerState::Inactive);

        wait_until(|| view.snapshot().is_initialized).await;
        wait_until(|| view.scheduler_state() == SchedulerState::Active).await;

        assert_eq!(view.metadata().map(|m| m.symbol), Some("mUMAMI".into()));
        assert_eq!(view.display_token_balance().as_deref(), Some("500"));
        view.teardown();
    }

    #[tokio::test(start_paused = true)]
    async fn mount_refuses_an_unresolvable_farm() {
        let sim = SimLedger::new();
        let result = FarmViewModel::mount(
            boost_descriptor(),
            environment(&sim, StaticStatsSource::empty()),
        );
        assert!(matches!(
            result,
            Err(EngineError::FarmBinding { .. })
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn polling_picks_up_chain_changes_on_cadence() {
        let sim = boost_sim();
        let view = FarmViewModel::mount(boost_descriptor(), environment(&sim, StaticStatsSource::empty()))
            .expect("mount");
        wait_until(|| view.snapshot().is_initialized).await;

        sim.mint(TOKEN, USER, gwei(250));
        wait_until(|| view.snapshot().token_balance == Some(gwei(750))).await;
        view.teardown();
    }

    #[tokio::test(start_paused = true)]
    async fn approval_flips_through_the_post_transaction_refresh() {
        let sim = boost_sim();
        let view = FarmViewModel::mount(boost_descriptor(), environment(&sim, StaticStatsSource::empty()))
            .expect("mount");
        wait_until(|| view.snapshot().is_initialized).await;
        assert!(!view.snapshot().is_approved);

        let outcome = view.deposit("100").await;
        assert!(outcome.is_confirmed());

        // No manual refresh: the confirmation requested one out of cycle.
        wait_until(|| view.snapshot().is_approved).await;
        assert!(view.scheduler().refreshes_requested() >= 1);
        assert!(view.can_submit_deposit("100"));
        assert!(!view.can_submit_deposit("600"));
        view.teardown();
    }

    #[tokio::test(start_paused = true)]
    async fn teardown_is_idempotent_and_freezes_the_snapshot() {
        let sim = boost_sim();
        let view = FarmViewModel::mount(boost_descriptor(), environment(&sim, StaticStatsSource::empty()))
            .expect("mount");
        wait_until(|| view.snapshot().is_initialized).await;
        let frozen = view.snapshot();

        view.teardown();
        view.teardown();
        assert_eq!(view.scheduler_state(), SchedulerState::Inactive);

        sim.mint(TOKEN, USER, gwei(250));
        tokio::time::sleep(Duration::from_secs(90)).await;
        assert_eq!(view.snapshot().token_balance, frozen.token_balance);

        let outcome = view.claim().await;
        assert!(matches!(outcome, TxOutcome::Skipped(_)));
    }

    #[tokio::test(start_paused = true)]
    async fn stats_feed_is_keyed_per_descriptor() {
        let sim = boost_sim();
        let feed = StaticStatsSource::with(AggregateStats {
            headline_apy_bps: Some(2_450),
            strategies: vec![StrategyStats {
                farm: FARM,
                apy_bps: 1_200,
                total_value_staked: gwei(9_000),
            }],
        });
        let view = FarmViewModel::mount(boost_descriptor(), environment(&sim, feed))
            .expect("mount");

        // Headline-keyed: the boost farm shows the protocol figure.
        assert_eq!(view.apy_bps(), Some(2_450));
        assert_eq!(view.total_value_staked(), Some(gwei(9_000)));

        view.teardown();
    }

    #[tokio::test(start_paused = true)]
    async fn countdown_follows_the_unlock_timestamp() {
        let sim = boost_sim();
        let view = FarmViewModel::mount(boost_descriptor(), environment(&sim, StaticStatsSource::empty()))
            .expect("mount");
        wait_until(|| view.snapshot().is_initialized).await;

        // Nothing staked yet: unlock time is zero, already passed.
        let receiver = view.start_countdown().expect("unlock time read");
        assert!(receiver.borrow().is_zero());
        view.stop_countdown();
        assert!(view.countdown_parts().is_none());
        view.teardown();
    }
}
