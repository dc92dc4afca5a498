//! Try-Confirm-Cancel scenarios through the public API.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use sagaflow::{
    Callback, CallbackRef, InfoSnapshot, SingleTcc, State, Tcc, TccGroup, TccOptions, TccPipeline,
    TccRef, TaskError, TaskFn, TaskRef,
};
use tokio_util::sync::CancellationToken;

#[derive(Clone, Default)]
struct Calls(Arc<Mutex<Vec<String>>>);

impl Calls {
    fn step(&self, label: String, fail: bool) -> TaskRef {
        let calls = self.clone();
        TaskFn::arc(
            label.clone(),
            move |_ctx: CancellationToken| {
                let (calls, label) = (calls.clone(), label.clone());
                async move {
                    calls.0.lock().unwrap().push(label.clone());
                    if fail {
                        Err(TaskError::fail(format!("{label} failed")))
                    } else {
                        Ok(())
                    }
                }
            },
            |_ctx: CancellationToken| async { Ok(()) },
        )
    }

    fn participant(&self, name: &str, fail_try: bool) -> TccRef<String> {
        Arc::new(SingleTcc::new(
            self.step(format!("try {name}"), fail_try),
            self.step(format!("confirm {name}"), false),
            self.step(format!("cancel {name}"), false),
            TccOptions::default().with_name(name),
        ))
    }

    fn with_prefix(&self, prefix: &str) -> Vec<String> {
        let mut out: Vec<String> = self
            .0
            .lock()
            .unwrap()
            .iter()
            .filter(|c| c.starts_with(prefix))
            .cloned()
            .collect();
        out.sort();
        out
    }
}

#[derive(Default)]
struct Phases(Mutex<Vec<(State, String)>>);

#[async_trait]
impl Callback<String> for Phases {
    async fn trigger(
        &self,
        _ctx: &CancellationToken,
        info: &InfoSnapshot,
        input: &String,
        _err: Option<&TaskError>,
    ) {
        self.0.lock().unwrap().push((info.state, input.clone()));
    }
}

#[tokio::test]
async fn group_failure_cancels_started_participants_only() {
    let calls = Calls::default();
    let phases = Arc::new(Phases::default());
    let group = TccGroup::new(
        vec![
            calls.participant("1", false),
            calls.participant("2", true),
            calls.participant("3", false),
        ],
        TccOptions::default().with_callback(phases.clone()),
    );

    let err = group
        .run(&CancellationToken::new(), &"order-7".to_string(), &[])
        .await
        .expect_err("participant 2 fails");

    assert_eq!(err, TaskError::fail("try 2 failed"));
    assert_eq!(calls.with_prefix("try"), vec!["try 1", "try 2"]);
    assert_eq!(calls.with_prefix("cancel"), vec!["cancel 1", "cancel 2"]);
    assert!(calls.with_prefix("confirm").is_empty());
    assert_eq!(
        *phases.0.lock().unwrap(),
        vec![
            (State::Running, "order-7".to_string()),
            (State::Error, "order-7".to_string()),
        ]
    );
}

#[tokio::test]
async fn pipeline_of_groups_confirms_everything() {
    let calls = Calls::default();
    let left: TccRef<String> = Arc::new(TccGroup::new(
        vec![calls.participant("a", false), calls.participant("b", false)],
        TccOptions::default(),
    ));
    let pipeline = TccPipeline::new(
        vec![left, calls.participant("c", false)],
        TccOptions::default().with_name("checkout"),
    );
    let scoped = Arc::new(Phases::default());

    pipeline
        .run(
            &CancellationToken::new(),
            &"order-8".to_string(),
            &[scoped.clone() as CallbackRef<String>],
        )
        .await
        .expect("every try succeeds");

    assert_eq!(
        calls.with_prefix("confirm"),
        vec!["confirm a", "confirm b", "confirm c"]
    );
    assert!(calls.with_prefix("cancel").is_empty());
    assert_eq!(pipeline.info().state(), State::Success);
    assert_eq!(scoped.0.lock().unwrap().last().map(|p| p.0), Some(State::Success));
}
