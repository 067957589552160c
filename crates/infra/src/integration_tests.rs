//! Integration tests for the host pipeline.
//!
//! Tests: Invocation → Transaction → TokenContract → commit → EventBus
//!
//! Verifies:
//! - Failed invocations leave no partial writes and publish nothing
//! - Stale reads are rejected at commit (MVCC)
//! - Events reach subscribers only after their transaction commits

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use chrono::{DateTime, TimeZone, Utc};

    use tokenledger_core::{CallerIdentity, WorldState};
    use tokenledger_events::{EventBus, EventEnvelope, InMemoryEventBus, Transferred};
    use tokenledger_wallet::{Account, CommitRecord, ContractConfig, KeySchema, TokenContract};

    use crate::command::Invocation;
    use crate::command_dispatcher::{DispatchError, InvocationDispatcher};
    use crate::config::HostConfig;
    use crate::world_state::{CommitError, InMemoryWorldState};

    type Dispatcher = InvocationDispatcher<Arc<InMemoryEventBus<EventEnvelope>>>;

    const ISSUER: &str = "ServerMSP";

    fn server() -> CallerIdentity {
        CallerIdentity::new("server", ISSUER)
    }

    fn user(id: &str) -> CallerIdentity {
        CallerIdentity::new(id, "Org1MSP")
    }

    fn at(secs: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(1_714_564_800 + secs, 0).unwrap()
    }

    fn setup_with(world: InMemoryWorldState, schema: KeySchema) -> Dispatcher {
        let bus = Arc::new(InMemoryEventBus::new());
        let contract = TokenContract::new(ContractConfig::with_key_schema(schema));
        let dispatcher = InvocationDispatcher::new(world, contract, bus);

        let config = HostConfig {
            key_schema: schema,
            issuer_org: Some(ISSUER.to_string()),
            seed_accounts: vec![],
        };
        assert!(dispatcher.bootstrap(&config).unwrap());
        dispatcher
    }

    fn setup() -> Dispatcher {
        setup_with(InMemoryWorldState::new(), KeySchema::Prefixed)
    }

    fn call(d: &Dispatcher, caller: CallerIdentity, function: &str, args: &[&str]) -> Result<serde_json::Value, DispatchError> {
        d.invoke_at(caller, &Invocation::new(function, args.iter().copied()), at(0))
            .map(|r| r.result)
    }

    fn balance(d: &Dispatcher, owner: &str) -> u64 {
        call(d, server(), "BalanceOf", &[owner]).unwrap().as_u64().unwrap()
    }

    fn seed_alice_and_bob(d: &Dispatcher) {
        call(d, server(), "CreateAccount", &["alice", "100"]).unwrap();
        call(d, server(), "CreateAccount", &["bob", "0"]).unwrap();
    }

    #[test]
    fn transfer_scenario_end_to_end() {
        let d = setup();
        seed_alice_and_bob(&d);

        let result = call(&d, user("alice"), "Transfer", &["alice", "bob", "40"]).unwrap();
        assert_eq!(result["from"]["balance"], 60);
        assert_eq!(result["to"]["balance"], 40);

        assert_eq!(balance(&d, "alice"), 60);
        assert_eq!(balance(&d, "bob"), 40);
        let stored: Account =
            serde_json::from_slice(&d.world().get("wallet_bob").unwrap().unwrap()).unwrap();
        assert_eq!(stored.balance.units(), 40);
    }

    #[test]
    fn reward_pays_once_and_records_tx_timestamp() {
        let d = setup();
        seed_alice_and_bob(&d);

        call(&d, server(), "RewardForCommit", &["alice", "sha1", "10"]).unwrap();
        let err = call(&d, server(), "RewardForCommit", &["alice", "sha1", "10"]).unwrap_err();
        assert_eq!(err.code(), "conflict");
        assert_eq!(balance(&d, "alice"), 110);

        let record: CommitRecord =
            serde_json::from_value(call(&d, server(), "GetCommitRecord", &["sha1"]).unwrap())
                .unwrap();
        assert_eq!(record.timestamp, at(0));
        assert_eq!(record.reward_amount.units(), 10);
    }

    #[test]
    fn storage_failure_rolls_back_the_whole_invocation() {
        let d = setup_with(
            InMemoryWorldState::new().reject_writes_with_prefix("commit_"),
            KeySchema::Prefixed,
        );
        seed_alice_and_bob(&d);
        let before = d.world().commit_sequence().unwrap();
        let sub = d.bus().subscribe();

        // The balance credit is staged before the record write fails.
        let err = call(&d, server(), "RewardForCommit", &["alice", "sha1", "10"]).unwrap_err();
        assert_eq!(err.code(), "storage_error");

        assert_eq!(balance(&d, "alice"), 100);
        assert_eq!(d.world().commit_sequence().unwrap(), before);
        assert!(sub.drain().is_empty());
    }

    #[test]
    fn rejected_privileged_call_commits_nothing() {
        let d = setup();
        seed_alice_and_bob(&d);
        let before = d.world().commit_sequence().unwrap();

        let err = call(&d, user("mallory"), "Mint", &["mallory", "1000"]).unwrap_err();
        assert_eq!(err.code(), "authorization_error");
        assert_eq!(d.world().commit_sequence().unwrap(), before);
        assert!(call(&d, server(), "GetAccount", &["mallory"]).is_err());
    }

    #[test]
    fn queries_are_never_committed() {
        let d = setup();
        seed_alice_and_bob(&d);
        let before = d.world().commit_sequence().unwrap();

        let response = d
            .invoke_at(user("alice"), &Invocation::new("MyBalance", Vec::<String>::new()), at(1))
            .unwrap();
        assert!(!response.committed());
        assert_eq!(response.result, 100);

        let all = call(&d, server(), "GetAllWallets", &[]).unwrap();
        assert_eq!(all.as_array().unwrap().len(), 2);
        assert_eq!(d.world().commit_sequence().unwrap(), before);
    }

    #[test]
    fn concurrent_transfers_from_one_account_conflict() {
        let d = setup();
        seed_alice_and_bob(&d);
        let contract = d.contract();

        let mut first = d.world().begin(user("alice"), at(1)).unwrap();
        let mut second = d.world().begin(user("alice"), at(1)).unwrap();
        contract.transfer(&mut first, "alice", "bob", 60).unwrap();
        contract.transfer(&mut second, "alice", "bob", 60).unwrap();

        d.world().commit(first).unwrap();
        let err = d.world().commit(second).unwrap_err();
        assert!(matches!(err, CommitError::ReadConflict { ref key, .. } if key == "wallet_alice"));

        assert_eq!(balance(&d, "alice"), 40);
        assert_eq!(balance(&d, "bob"), 60);
    }

    #[test]
    fn concurrent_rewards_for_one_hash_pay_once() {
        let d = setup();
        seed_alice_and_bob(&d);
        let contract = d.contract();

        let mut a = d.world().begin(server(), at(1)).unwrap();
        let mut b = d.world().begin(server(), at(1)).unwrap();
        contract.reward_for_commit(&mut a, "alice", "sha1", 10).unwrap();
        contract.reward_for_commit(&mut b, "bob", "sha1", 10).unwrap();

        d.world().commit(a).unwrap();
        assert!(d.world().commit(b).is_err());
        assert_eq!(balance(&d, "alice") + balance(&d, "bob"), 110);
    }

    #[test]
    fn account_created_during_listing_is_a_phantom() {
        let d = setup();
        seed_alice_and_bob(&d);
        let contract = d.contract();

        let mut listing = d.world().begin(server(), at(1)).unwrap();
        let seen = contract.list_accounts(&listing).unwrap().count();
        assert_eq!(seen, 2);
        listing.put_state("audit_marker", b"2".to_vec()).unwrap();

        call(&d, server(), "CreateAccount", &["carol", "5"]).unwrap();
        assert!(matches!(
            d.world().commit(listing),
            Err(CommitError::PhantomRead { .. })
        ));
    }

    #[test]
    fn events_reach_subscribers_after_commit() {
        let d = setup();
        seed_alice_and_bob(&d);

        let bus = d.bus().clone();
        let (ready_tx, ready_rx) = std::sync::mpsc::channel::<()>();
        let (seen_tx, seen_rx) = std::sync::mpsc::channel::<EventEnvelope>();
        std::thread::spawn(move || {
            let sub = bus.subscribe();
            let _ = ready_tx.send(());
            while let Ok(env) = sub.recv() {
                if seen_tx.send(env).is_err() {
                    break;
                }
            }
        });
        let _ = ready_rx.recv_timeout(Duration::from_secs(1));

        call(&d, user("bob"), "Transfer", &["bob", "alice", "1"]).unwrap_err();
        let response = d
            .invoke_at(user("alice"), &Invocation::new("Transfer", ["alice", "bob", "25"]), at(2))
            .unwrap();

        let env = seen_rx.recv_timeout(Duration::from_secs(1)).unwrap();
        assert_eq!(env.name(), "TransferEvent");
        assert_eq!(env.tx_id(), response.tx_id);
        assert_eq!(Some(env.commit_sequence()), response.commit_sequence);

        let payload: Transferred = env.decode().unwrap();
        assert_eq!(payload.amount.units(), 25);
        assert_eq!(payload.occurred_at, at(2));
        assert!(seen_rx.recv_timeout(Duration::from_millis(50)).is_err());
    }

    #[test]
    fn plain_schema_end_to_end() {
        let d = setup_with(InMemoryWorldState::new(), KeySchema::Plain);
        call(&d, server(), "CreateWallet", &["octocat"]).unwrap();
        call(&d, server(), "RewardForCommit", &["octocat", "abc123", "3"]).unwrap();

        assert!(d.world().get("octocat").unwrap().is_some());
        let wallets = call(&d, server(), "GetAllWallets", &[]).unwrap();
        assert_eq!(wallets.as_array().unwrap().len(), 1);
        assert_eq!(wallets[0]["ownerID"], "octocat");
        assert_eq!(wallets[0]["balance"], 3);
    }

    #[test]
    fn bootstrap_runs_once() {
        let d = setup();
        let config = HostConfig {
            issuer_org: Some("Org2MSP".into()),
            ..HostConfig::default()
        };
        assert!(!d.bootstrap(&config).unwrap());
        assert_eq!(d.world().get("AUTHORIZED_SERVER_MSPID").unwrap(), Some(ISSUER.as_bytes().to_vec()));
    }

    #[test]
    fn malformed_invocations_never_open_a_transaction() {
        let d = setup();
        let before = d.world().commit_sequence().unwrap();
        let err = call(&d, server(), "Transfer", &["alice", "bob", "ten"]).unwrap_err();
        assert_eq!(err.code(), "validation_error");
        assert_eq!(d.world().commit_sequence().unwrap(), before);
    }
}
