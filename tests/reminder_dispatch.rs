// tests/reminder_dispatch.rs

use std::{
    collections::HashSet,
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc, Mutex,
    },
    time::Duration,
};

use async_trait::async_trait;
use chrono::{DateTime, Duration as ChronoDuration, Utc};
use rust_decimal::Decimal;
use serde_json::{json, Value};

use cotizaciones::{
    common::{
        cache::{CacheTtls, QueryCache},
        error::AppError,
    },
    db::{Collection, DocumentStore, MemoryDocumentStore, QuoteRepository, Repository},
    models::{
        quote::{Quote, Reminder, ReminderType},
        user::User,
    },
    services::{Mailer, OutgoingEmail, ReminderDispatcher, ReminderPoller, TickReport},
};

const OPERATOR: &str = "operador@av.mx";

/// Mailer roteirizado: registra cada tentativa e falha para os endereços marcados.
#[derive(Default)]
struct ScriptedMailer {
    attempts: Mutex<Vec<String>>,
    failing: Mutex<HashSet<String>>,
    refusing: Mutex<HashSet<String>>,
    delay: Option<Duration>,
    panic_next: AtomicBool,
}

impl ScriptedMailer {
    fn slow(delay: Duration) -> Self {
        Self { delay: Some(delay), ..Default::default() }
    }

    fn fail_for(&self, to: &str) {
        self.failing.lock().unwrap().insert(to.to_string());
    }

    fn refuse_for(&self, to: &str) {
        self.refusing.lock().unwrap().insert(to.to_string());
    }

    fn panic_on_next_send(&self) {
        self.panic_next.store(true, Ordering::SeqCst);
    }

    fn recover(&self) {
        self.failing.lock().unwrap().clear();
        self.refusing.lock().unwrap().clear();
    }

    fn attempts(&self) -> Vec<String> {
        self.attempts.lock().unwrap().clone()
    }
}

#[async_trait]
impl Mailer for ScriptedMailer {
    async fn send(&self, email: &OutgoingEmail) -> Result<bool, AppError> {
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        if self.panic_next.swap(false, Ordering::SeqCst) {
            panic!("transporte de e-mail quebrou enviando para {}", email.to);
        }
        self.attempts.lock().unwrap().push(email.to.clone());
        if self.failing.lock().unwrap().contains(&email.to) {
            return Err(AppError::Transport(format!("conexão recusada para {}", email.to)));
        }
        Ok(!self.refusing.lock().unwrap().contains(&email.to))
    }
}

struct Fixture {
    store: Arc<dyn DocumentStore>,
    quotes: QuoteRepository,
    mailer: Arc<ScriptedMailer>,
    dispatcher: Arc<ReminderDispatcher>,
}

fn fixture_with(mailer: ScriptedMailer) -> Fixture {
    let store: Arc<dyn DocumentStore> = Arc::new(MemoryDocumentStore::new());
    let mailer = Arc::new(mailer);
    let dispatcher = Arc::new(ReminderDispatcher::new(
        store.clone(),
        mailer.clone(),
        QueryCache::new(CacheTtls::default()),
        OPERATOR.to_string(),
    ));
    Fixture {
        quotes: QuoteRepository::new(store.clone()),
        store,
        mailer,
        dispatcher,
    }
}

fn fixture() -> Fixture {
    fixture_with(ScriptedMailer::default())
}

fn reminder(minutes_from_now: i64, destinatarios: &[&str]) -> Reminder {
    // O documento guarda milissegundos; truncamos para comparar com o lido
    let fecha = Utc::now() + ChronoDuration::minutes(minutes_from_now);
    Reminder {
        fecha: DateTime::from_timestamp_millis(fecha.timestamp_millis()).unwrap(),
        tipo: ReminderType::Seguimiento,
        mensaje: "Llamar para confirmar".into(),
        destinatarios: destinatarios.iter().map(|s| s.to_string()).collect(),
        enviar_email: true,
        enviar_push: false,
        creado_por: Some("Ana".into()),
    }
}

async fn seed_quote(fx: &Fixture, id: &str, reminder: Option<Reminder>) {
    let mut quote = Quote::draft(id);
    quote.numero = format!("COT-{}", id);
    quote.titulo = "Boda Jardín".into();
    quote.recordatorio = reminder;
    fx.quotes.create(&quote).await.unwrap();
}

async fn stored_reminder(fx: &Fixture, id: &str) -> Option<Reminder> {
    fx.quotes.find(id).await.unwrap().unwrap().recordatorio
}

#[tokio::test]
async fn partial_failure_still_clears_the_reminder() {
    let fx = fixture();
    fx.mailer.fail_for("b@av.mx");
    seed_quote(&fx, "q1", Some(reminder(-5, &["a@av.mx", "b@av.mx", "c@av.mx"]))).await;

    let report = fx.dispatcher.process_reminders().await;

    // Todos os destinatários são tentados, mesmo depois da falha do segundo
    assert_eq!(fx.mailer.attempts(), vec!["a@av.mx", "b@av.mx", "c@av.mx"]);
    assert_eq!(
        report,
        TickReport { skipped: false, due: 1, sent: 2, failed: 1, cleared: 1 }
    );
    assert!(stored_reminder(&fx, "q1").await.is_none());
}

#[tokio::test]
async fn total_failure_keeps_the_reminder_for_the_next_tick() {
    let fx = fixture();
    fx.mailer.fail_for("a@av.mx");
    fx.mailer.refuse_for("b@av.mx");
    let pending = reminder(-1, &["a@av.mx", "b@av.mx"]);
    seed_quote(&fx, "q1", Some(pending.clone())).await;

    let first = fx.dispatcher.process_reminders().await;
    assert_eq!(first.failed, 2);
    assert_eq!(first.cleared, 0);
    assert_eq!(stored_reminder(&fx, "q1").await, Some(pending));

    fx.mailer.recover();
    let second = fx.dispatcher.process_reminders().await;
    assert_eq!(second.sent, 2);
    assert_eq!(second.cleared, 1);
    assert!(stored_reminder(&fx, "q1").await.is_none());
    assert_eq!(fx.mailer.attempts().len(), 4);
}

#[tokio::test]
async fn future_and_email_disabled_reminders_are_left_alone() {
    let fx = fixture();
    let future = reminder(60, &["a@av.mx"]);
    let mut push_only = reminder(-60, &["a@av.mx"]);
    push_only.enviar_email = false;
    push_only.enviar_push = true;
    seed_quote(&fx, "futuro", Some(future.clone())).await;
    seed_quote(&fx, "push", Some(push_only.clone())).await;
    seed_quote(&fx, "sin", None).await;

    let report = fx.dispatcher.process_reminders().await;

    assert_eq!(report, TickReport::default());
    assert!(fx.mailer.attempts().is_empty());
    assert_eq!(stored_reminder(&fx, "futuro").await, Some(future));
    assert_eq!(stored_reminder(&fx, "push").await, Some(push_only));
}

#[tokio::test]
async fn empty_recipient_list_falls_back_to_users_then_operator() {
    let fx = fixture();
    let users: Repository<User> = Repository::new(fx.store.clone());

    seed_quote(&fx, "q1", Some(reminder(-1, &[]))).await;
    fx.dispatcher.process_reminders().await;
    assert_eq!(fx.mailer.attempts(), vec![OPERATOR]);

    for (id, email, activo, notificaciones_email) in [
        ("u1", "vendedor@av.mx", true, true),
        ("u2", "VENDEDOR@av.mx", true, true),
        ("u3", "inactivo@av.mx", false, true),
        ("u4", "silencio@av.mx", true, false),
    ] {
        users
            .insert(&User {
                id: id.into(),
                nombre: id.to_uppercase(),
                email: email.into(),
                activo,
                notificaciones_email,
            })
            .await
            .unwrap();
    }
    seed_quote(&fx, "q2", Some(reminder(-1, &[]))).await;
    fx.dispatcher.process_reminders().await;
    assert_eq!(fx.mailer.attempts(), vec![OPERATOR, "vendedor@av.mx"]);
}

#[tokio::test]
async fn overlapping_tick_is_skipped() {
    let fx = fixture_with(ScriptedMailer::slow(Duration::from_millis(200)));
    seed_quote(&fx, "q1", Some(reminder(-1, &["a@av.mx"]))).await;

    let dispatcher = fx.dispatcher.clone();
    let first = tokio::spawn(async move { dispatcher.process_reminders().await });
    tokio::time::sleep(Duration::from_millis(50)).await;

    let overlapping = fx.dispatcher.process_reminders().await;
    assert!(overlapping.skipped);
    assert_eq!(overlapping.due, 0);

    let first = first.await.unwrap();
    assert!(!first.skipped);
    assert_eq!(first.cleared, 1);
    assert_eq!(fx.mailer.attempts(), vec!["a@av.mx"]);

    // Liberado o guard, o próximo tick roda normalmente
    assert!(!fx.dispatcher.process_reminders().await.skipped);
}

#[tokio::test]
async fn reminder_rescheduled_during_dispatch_survives() {
    let fx = fixture_with(ScriptedMailer::slow(Duration::from_millis(150)));
    seed_quote(&fx, "q1", Some(reminder(-1, &["a@av.mx"]))).await;

    let dispatcher = fx.dispatcher.clone();
    let tick = tokio::spawn(async move { dispatcher.process_reminders().await });
    tokio::time::sleep(Duration::from_millis(50)).await;

    // Alguém agenda um lembrete novo enquanto o e-mail do antigo está saindo
    let replacement = reminder(120, &["nuevo@av.mx"]);
    fx.quotes.set_reminder("q1", &replacement, Utc::now()).await.unwrap();

    let report = tick.await.unwrap();
    assert_eq!(report.sent, 1);
    assert_eq!(report.cleared, 0);
    assert_eq!(stored_reminder(&fx, "q1").await, Some(replacement));
}

#[tokio::test]
async fn legacy_document_with_overflowing_amounts_is_still_reminded() {
    let fx = fixture();
    let Value::Object(data) = json!({
        "numero": "COT-LEGADO",
        "titulo": "Evento antiguo",
        "items": [{"cantidad": 1e15, "precio": 1e15}],
        "recordatorio_fecha": "2020-01-01T00:00:00.000Z",
        "recordatorio_destinatarios": ["a@av.mx"]
    }) else {
        unreachable!()
    };
    fx.store.create(Collection::Quotes, "legado", data).await.unwrap();

    let report = fx.dispatcher.process_reminders().await;

    assert_eq!(
        report,
        TickReport { skipped: false, due: 1, sent: 1, failed: 0, cleared: 1 }
    );
    let quote = fx.quotes.find("legado").await.unwrap().unwrap();
    assert!(quote.recordatorio.is_none());
    assert_eq!(quote.items[0].subtotal, Decimal::ZERO);
}

// ===================================================================
// POLLER
// ===================================================================

#[tokio::test(start_paused = true)]
async fn poller_ticks_on_its_interval_until_stopped() {
    let fx = fixture();
    // recusado sempre: cada tick tenta de novo e deixa rastro em `attempts`
    fx.mailer.refuse_for("a@av.mx");
    seed_quote(&fx, "q1", Some(reminder(-1, &["a@av.mx"]))).await;
    let poller = ReminderPoller::new(fx.dispatcher.clone(), Duration::from_secs(60));

    assert!(poller.start());
    assert!(!poller.start());
    assert!(poller.is_running());

    // ticks em 0s, 60s e 120s
    tokio::time::sleep(Duration::from_secs(150)).await;
    assert_eq!(fx.mailer.attempts().len(), 3);

    assert!(poller.stop());
    assert!(!poller.stop());
    assert!(!poller.is_running());

    tokio::time::sleep(Duration::from_secs(600)).await;
    assert_eq!(fx.mailer.attempts().len(), 3);
}

#[tokio::test(start_paused = true)]
async fn poller_survives_a_panicking_tick() {
    let fx = fixture();
    fx.mailer.panic_on_next_send();
    seed_quote(&fx, "q1", Some(reminder(-1, &["a@av.mx"]))).await;
    let poller = ReminderPoller::new(fx.dispatcher.clone(), Duration::from_secs(60));
    assert!(poller.start());

    // o tick de 0s entra em pânico; o de 60s entrega e limpa o lembrete
    tokio::time::sleep(Duration::from_secs(90)).await;

    assert!(poller.is_running());
    assert_eq!(fx.mailer.attempts(), vec!["a@av.mx"]);
    assert!(stored_reminder(&fx, "q1").await.is_none());
    assert!(poller.stop());
}
