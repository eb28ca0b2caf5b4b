//! End-to-end runs of the provisioner against in-memory collaborators.

use std::sync::Arc;
use std::time::Duration;

use btp_provisioner::application::Provisioner;
use btp_provisioner::domain::metadata::{CREATED_APP_SUBSCRIPTIONS, CREATED_SERVICE_INSTANCES};
use btp_provisioner::domain::{
    ExecutionStatus, RunTiming, ServiceStatus, SubscriptionState, TargetEnvironment,
};
use btp_provisioner::error::{
    ConfigError, Error, ProvisionError, EXIT_DATA_ERROR, EXIT_INTERRUPTED, EXIT_TEMP_FAILURE,
};
use btp_provisioner::infrastructure::usecase::parse_usecase;
use btp_provisioner::port::Backends;
use btp_provisioner::testkit::config::fast_timing;
use btp_provisioner::testkit::domain::{account_metadata, app, context, registry, service};
use btp_provisioner::testkit::fakes::{FakeBackend, FakeSubscriptions};
use serde_json::json;
use tokio::sync::watch;

fn in_progress() -> ServiceStatus {
    ServiceStatus::in_progress("create in progress", None)
}

#[tokio::test(start_paused = true)]
async fn mixed_use_case_converges_and_aggregates_metadata() {
    let registry = parse_usecase(
        r#"{"services": [
            {"name": "xsuaa", "category": "SERVICE", "plan": "application"},
            {"name": "hana", "category": "SERVICE", "plan": "hana", "entitleonly": true},
            {"name": "workzone", "category": "APPLICATION", "plan": "standard",
             "requiredServices": ["xsuaa"]},
            {"name": "kymaruntime", "category": "ELASTIC_SERVICE", "plan": "aws",
             "targetenvironment": "sapbtp", "repeatstatusrequest": 5}
        ]}"#,
    )
    .unwrap();

    let subscriptions = Arc::new(
        FakeSubscriptions::new()
            .with_progress("workzone", [SubscriptionState::InProcess, SubscriptionState::Subscribed]),
    );
    let cf = Arc::new(
        FakeBackend::new(TargetEnvironment::CloudFoundry)
            .with_progress("xsuaa", [in_progress(), ServiceStatus::succeeded(None)]),
    );
    let btp = Arc::new(
        FakeBackend::new(TargetEnvironment::SapBtp).with_progress(
            "kymaruntime",
            [in_progress(), in_progress(), ServiceStatus::succeeded(None)],
        ),
    );
    let provisioner = Provisioner::new(
        context(
            subscriptions.clone(),
            Backends::new().with(cf.clone()).with(btp.clone()),
        ),
        fast_timing(),
    );
    let metadata = account_metadata();
    let (_tx, rx) = watch::channel(false);

    let report = provisioner.provision(registry, metadata, rx).await.unwrap();

    // IN_PROCESS apps are subscribed again on the next pass.
    let subscribed = subscriptions.subscribed();
    assert!(!subscribed.is_empty());
    assert!(subscribed.iter().all(|name| name == "workzone"));
    assert_eq!(cf.created(), vec!["xsuaa".to_string()]);
    assert_eq!(btp.created(), vec!["kymaruntime".to_string()]);

    let apps = report.metadata.list(CREATED_APP_SUBSCRIPTIONS);
    let instances = report.metadata.list(CREATED_SERVICE_INSTANCES);
    assert_eq!(apps.len(), 1);
    assert_eq!(instances.len(), 3);
    assert_eq!(apps[0]["tenantId"], "tenant-workzone");
    assert_eq!(apps[0]["executionStatus"], "AVAILABLE");
    assert_eq!(instances[1]["name"], "hana");
    assert_eq!(instances[1]["executionStatus"], "PENDING");
    assert_eq!(report.metadata.subaccount_id(), Some("sub-test"));
}

#[tokio::test(start_paused = true)]
async fn existing_metadata_lists_are_extended() {
    let subscriptions = Arc::new(FakeSubscriptions::new());
    let provisioner = Provisioner::new(context(subscriptions, Backends::new()), fast_timing());
    let metadata = serde_json::from_value(json!({
        "subaccountid": "sub-test",
        "createdAppSubscriptions": [{"name": "earlier"}],
        "region": "eu10",
    }))
    .unwrap();
    let (_tx, rx) = watch::channel(false);

    let report = provisioner
        .provision(registry(vec![app("workzone")], vec![]), metadata, rx)
        .await
        .unwrap();

    let apps = report.metadata.list(CREATED_APP_SUBSCRIPTIONS);
    assert_eq!(apps.len(), 2);
    assert_eq!(apps[0]["name"], "earlier");
    assert_eq!(apps[1]["name"], "workzone");
    assert_eq!(report.metadata.get("region"), Some(&json!("eu10")));
}

#[tokio::test(start_paused = true)]
async fn subscribe_failed_aborts_the_run() {
    let subscriptions = Arc::new(
        FakeSubscriptions::new().with_progress("audit", vec![SubscriptionState::SubscribeFailed; 5]),
    );
    let provisioner = Provisioner::new(
        context(subscriptions, Backends::new()),
        RunTiming::new(Duration::from_secs(5), Duration::from_secs(3600)),
    );
    let (_tx, rx) = watch::channel(false);
    let started = tokio::time::Instant::now();

    let result = provisioner
        .provision(registry(vec![app("audit")], vec![]), account_metadata(), rx)
        .await;

    match result {
        Err(Error::Provision(ProvisionError::SubscriptionFailed { ref app })) => {
            assert_eq!(app, "audit");
        }
        other => panic!("expected subscription failure, got {other:?}"),
    }
    assert!(started.elapsed() < Duration::from_secs(60));
}

#[tokio::test(start_paused = true)]
async fn stuck_instance_times_out() {
    let backend = Arc::new(
        FakeBackend::new(TargetEnvironment::CloudFoundry).with_progress("slow", [in_progress()]),
    );
    let provisioner = Provisioner::new(
        context(Arc::new(FakeSubscriptions::new()), Backends::new().with(backend.clone())),
        RunTiming::new(Duration::from_secs(10), Duration::from_secs(120)),
    );
    let (_tx, rx) = watch::channel(false);

    let err = provisioner
        .provision(registry(vec![], vec![service("slow")]), account_metadata(), rx)
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        Error::Provision(ProvisionError::Timeout { elapsed_secs }) if elapsed_secs >= 120
    ));
    assert_eq!(err.exit_code(), EXIT_TEMP_FAILURE);
    assert_eq!(backend.create_count(), 1);
}

#[tokio::test(start_paused = true)]
async fn shutdown_cancels_the_run() {
    let provisioner = Provisioner::new(
        context(
            Arc::new(
                FakeSubscriptions::new()
                    .with_progress("never", vec![SubscriptionState::InProcess; 20]),
            ),
            Backends::new(),
        ),
        RunTiming::new(Duration::from_secs(5), Duration::from_secs(3600)),
    );
    let (tx, rx) = watch::channel(false);
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_secs(12)).await;
        let _ = tx.send(true);
    });

    let err = provisioner
        .provision(registry(vec![app("never")], vec![]), account_metadata(), rx)
        .await
        .unwrap_err();

    assert!(matches!(err, Error::Provision(ProvisionError::Cancelled)));
    assert_eq!(err.exit_code(), EXIT_INTERRUPTED);
}

#[tokio::test(start_paused = true)]
async fn transient_failures_do_not_stop_the_run() {
    let subscriptions = Arc::new(
        FakeSubscriptions::new()
            .with_subscribe_failures(2)
            .with_list_failures(2),
    );
    let backend = Arc::new(
        FakeBackend::new(TargetEnvironment::CloudFoundry)
            .with_create_failures(1)
            .with_status_failures(2),
    );
    let provisioner = Provisioner::new(
        context(subscriptions.clone(), Backends::new().with(backend.clone())),
        fast_timing(),
    );
    let (_tx, rx) = watch::channel(false);

    let report = provisioner
        .provision(
            registry(vec![app("workzone")], vec![service("xsuaa")]),
            account_metadata(),
            rx,
        )
        .await
        .unwrap();

    assert!(subscriptions.subscribe_count() >= 3);
    assert!(backend.create_count() >= 2);
    assert!(report
        .registry
        .applications()
        .iter()
        .chain(report.registry.services())
        .all(|def| def.execution_status == ExecutionStatus::Available));
}

#[tokio::test(start_paused = true)]
async fn entitle_only_prerequisite_fails_before_any_tool_call() {
    let subscriptions = Arc::new(FakeSubscriptions::new());
    let backend = Arc::new(FakeBackend::new(TargetEnvironment::CloudFoundry));
    let provisioner = Provisioner::new(
        context(subscriptions.clone(), Backends::new().with(backend.clone())),
        RunTiming::new(Duration::from_secs(4), Duration::from_secs(4200)),
    );
    let (_tx, rx) = watch::channel(false);
    let started = tokio::time::Instant::now();

    let err = provisioner
        .provision(
            registry(
                vec![],
                vec![
                    service("hana").entitle_only(),
                    service("api").requiring_services(["hana"]),
                ],
            ),
            account_metadata(),
            rx,
        )
        .await
        .unwrap_err();

    match err {
        Error::Config(ConfigError::UnsatisfiablePrerequisite {
            ref name,
            ref prerequisite,
            ..
        }) => {
            assert_eq!(name, "api");
            assert_eq!(prerequisite, "hana");
        }
        ref other => panic!("expected an unsatisfiable prerequisite, got {other:?}"),
    }
    assert_eq!(err.exit_code(), EXIT_DATA_ERROR);
    assert!(started.elapsed() < Duration::from_secs(1));
    assert_eq!(backend.create_count(), 0);
    assert_eq!(backend.status_count(), 0);
    assert_eq!(subscriptions.subscribe_count(), 0);
}
