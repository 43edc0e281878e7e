// src/services/reminder_dispatcher.rs

//! Envio dos lembretes vencidos.
//!
//! A cada tick: lista as cotizações, pega os lembretes com e-mail ligado e
//! data <= agora, manda um e-mail por destinatário (sem parar na primeira
//! falha) e limpa o lembrete se pelo menos um envio deu certo. Se nenhum deu,
//! o lembrete fica e o próximo tick tenta todos de novo.

use std::{
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc, Mutex,
    },
    time::Duration,
};

use chrono::{DateTime, Local, Utc};
use serde::Serialize;
use tokio::{task::JoinHandle, time::MissedTickBehavior};
use utoipa::ToSchema;

use crate::{
    common::{cache::QueryCache, dates::format_display},
    db::{DocumentStore, Query, QuoteRepository, Repository},
    models::{
        client::Client,
        quote::{Quote, Reminder},
        user::User,
    },
    services::{
        mailer::{Mailer, OutgoingEmail},
        quote_service::ENTITY,
    },
};

/// Resultado de um tick.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, ToSchema)]
pub struct TickReport {
    /// Outro tick ainda estava rodando; este não fez nada.
    pub skipped: bool,
    pub due: usize,
    pub sent: usize,
    pub failed: usize,
    pub cleared: usize,
}

// Libera a flag de "tick em andamento" ao sair do escopo, até em pânico.
struct TickGuard<'a>(&'a AtomicBool);

impl<'a> TickGuard<'a> {
    fn acquire(flag: &'a AtomicBool) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| TickGuard(flag))
    }
}

impl Drop for TickGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

pub struct ReminderDispatcher {
    quotes: QuoteRepository,
    clients: Repository<Client>,
    users: Repository<User>,
    mailer: Arc<dyn Mailer>,
    cache: QueryCache,
    fallback_email: String,
    is_processing: AtomicBool,
}

impl ReminderDispatcher {
    pub fn new(
        store: Arc<dyn DocumentStore>,
        mailer: Arc<dyn Mailer>,
        cache: QueryCache,
        fallback_email: String,
    ) -> Self {
        Self {
            quotes: QuoteRepository::new(store.clone()),
            clients: Repository::new(store.clone()),
            users: Repository::new(store),
            mailer,
            cache,
            fallback_email,
            is_processing: AtomicBool::new(false),
        }
    }

    pub async fn process_reminders(&self) -> TickReport {
        self.process_reminders_at(Utc::now()).await
    }

    pub async fn process_reminders_at(&self, now: DateTime<Utc>) -> TickReport {
        let Some(_guard) = TickGuard::acquire(&self.is_processing) else {
            tracing::warn!("⏳ Tick de lembretes ignorado: o anterior ainda está em andamento");
            return TickReport { skipped: true, ..Default::default() };
        };

        let mut report = TickReport::default();
        let quotes = match self.quotes.list(&Query::new()).await {
            Ok(quotes) => quotes,
            Err(e) => {
                tracing::error!("Falha ao listar cotizações para lembretes: {}", e);
                return report;
            }
        };

        for quote in &quotes {
            let Some(reminder) = &quote.recordatorio else {
                continue;
            };
            if !reminder.is_due(now) {
                continue;
            }
            report.due += 1;
            self.dispatch(quote, reminder, now, &mut report).await;
        }

        if report.cleared > 0 {
            self.cache.invalidate_entity(ENTITY).await;
        }
        if report.due > 0 {
            tracing::info!(
                "🔔 Lembretes: {} vencidos, {} e-mails enviados, {} falhas, {} concluídos",
                report.due,
                report.sent,
                report.failed,
                report.cleared
            );
        } else {
            tracing::debug!("Nenhum lembrete vencido");
        }
        report
    }

    /// Lista explícita -> usuários com notificação por e-mail -> operador.
    pub async fn resolve_recipients(&self, reminder: &Reminder) -> Vec<String> {
        if !reminder.destinatarios.is_empty() {
            return reminder.destinatarios.clone();
        }
        match self.users.list_email_recipients().await {
            Ok(users) if !users.is_empty() => users,
            Ok(_) => vec![self.fallback_email.clone()],
            Err(e) => {
                tracing::warn!("Falha ao ler usuários para lembrete: {}; usando operador", e);
                vec![self.fallback_email.clone()]
            }
        }
    }

    async fn dispatch(&self, quote: &Quote, reminder: &Reminder, now: DateTime<Utc>, report: &mut TickReport) {
        let recipients = self.resolve_recipients(reminder).await;
        let client = match &quote.cliente_id {
            Some(id) => match self.clients.find(id).await {
                Ok(client) => client,
                Err(e) => {
                    tracing::warn!("Cliente {} da cotização {} ilegível: {}", id, quote.id, e);
                    None
                }
            },
            None => None,
        };
        let (subject, html, text) = render_email(quote, reminder, client.as_ref());

        let mut delivered = 0;
        for to in recipients {
            let email = OutgoingEmail {
                to: to.clone(),
                subject: subject.clone(),
                html: html.clone(),
                text: text.clone(),
            };
            match self.mailer.send(&email).await {
                Ok(true) => {
                    delivered += 1;
                    tracing::info!("📧 Lembrete da cotização {} enviado para {}", quote.id, to);
                }
                Ok(false) => {
                    report.failed += 1;
                    tracing::warn!("Servidor recusou o lembrete da cotização {} para {}", quote.id, to);
                }
                Err(e) => {
                    report.failed += 1;
                    tracing::warn!("Lembrete da cotização {} não enviado para {}: {}", quote.id, to, e);
                }
            }
        }
        report.sent += delivered;

        if delivered == 0 {
            tracing::warn!("Nenhum envio do lembrete da cotização {} deu certo; fica para o próximo tick", quote.id);
            return;
        }
        match self.quotes.clear_reminder_if_unchanged(&quote.id, reminder, now).await {
            Ok(true) => report.cleared += 1,
            Ok(false) => {}
            Err(e) => tracing::error!("Falha ao limpar o lembrete da cotização {}: {}", quote.id, e),
        }
    }
}

fn escape_html(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for c in raw.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

/// (assunto, html, texto) do e-mail de lembrete.
pub fn render_email(quote: &Quote, reminder: &Reminder, client: Option<&Client>) -> (String, String, String) {
    let numero = if quote.numero.is_empty() { quote.id.as_str() } else { quote.numero.as_str() };
    let cliente = client.map(|c| c.nombre.as_str()).unwrap_or("Sin cliente");
    let evento = format_display(quote.fecha_evento.and_then(|d| d.and_hms_opt(12, 0, 0)));
    let programado = reminder
        .fecha
        .with_timezone(&Local)
        .format("%d/%m/%Y %H:%M")
        .to_string();
    let mensaje = if reminder.mensaje.is_empty() {
        "(sin mensaje)"
    } else {
        reminder.mensaje.as_str()
    };

    let subject = format!("Recordatorio de {}: {} - {}", reminder.tipo.label(), numero, quote.titulo);

    let text = format!(
        "Recordatorio de {tipo}\n\n\
         Cotización: {numero}\n\
         Evento: {titulo}\n\
         Cliente: {cliente}\n\
         Fecha del evento: {evento}\n\
         Estado: {estado}\n\
         Total: ${total}\n\n\
         Mensaje:\n{mensaje}\n\n\
         Programado para {programado}{autor}",
        tipo = reminder.tipo.label(),
        titulo = quote.titulo,
        estado = quote.estado,
        total = quote.total,
        autor = reminder
            .creado_por
            .as_deref()
            .map(|a| format!(" por {}", a))
            .unwrap_or_default(),
    );

    let html = format!(
        "<div style=\"font-family:Arial,sans-serif;max-width:600px\">\
         <h2 style=\"color:#1f3a60\">Recordatorio de {tipo}</h2>\
         <table style=\"border-collapse:collapse\">\
         <tr><td><strong>Cotización</strong></td><td>{numero}</td></tr>\
         <tr><td><strong>Evento</strong></td><td>{titulo}</td></tr>\
         <tr><td><strong>Cliente</strong></td><td>{cliente}</td></tr>\
         <tr><td><strong>Fecha del evento</strong></td><td>{evento}</td></tr>\
         <tr><td><strong>Estado</strong></td><td>{estado}</td></tr>\
         <tr><td><strong>Total</strong></td><td>${total}</td></tr>\
         </table>\
         <p style=\"white-space:pre-line\">{mensaje}</p>\
         <p style=\"color:#777;font-size:12px\">Programado para {programado}{autor}</p>\
         </div>",
        tipo = escape_html(reminder.tipo.label()),
        numero = escape_html(numero),
        titulo = escape_html(&quote.titulo),
        cliente = escape_html(cliente),
        evento = escape_html(&evento),
        estado = quote.estado,
        total = quote.total,
        mensaje = escape_html(mensaje),
        programado = escape_html(&programado),
        autor = reminder
            .creado_por
            .as_deref()
            .map(|a| format!(" por {}", escape_html(a)))
            .unwrap_or_default(),
    );

    (subject, html, text)
}

// =========================================================================
//  POLLER
// =========================================================================

/// Dispara `process_reminders` a cada `interval`. Iniciar duas vezes não faz nada.
pub struct ReminderPoller {
    dispatcher: Arc<ReminderDispatcher>,
    interval: Duration,
    running: AtomicBool,
    handle: Mutex<Option<JoinHandle<()>>>,
}

impl ReminderPoller {
    pub fn new(dispatcher: Arc<ReminderDispatcher>, interval: Duration) -> Self {
        Self {
            dispatcher,
            interval,
            running: AtomicBool::new(false),
            handle: Mutex::new(None),
        }
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// `false` se já estava rodando.
    pub fn start(&self) -> bool {
        if self.running.swap(true, Ordering::SeqCst) {
            tracing::debug!("Poller de lembretes já está rodando");
            return false;
        }
        let dispatcher = Arc::clone(&self.dispatcher);
        let every = self.interval;
        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(every);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
            loop {
                ticker.tick().await;
                // Cada tick numa tarefa própria: um pânico derruba o tick, não o poller
                let tick = Arc::clone(&dispatcher);
                if let Err(e) = tokio::spawn(async move { tick.process_reminders().await }).await {
                    tracing::error!("❌ Tick de lembretes abortado: {}", e);
                }
            }
        });
        let mut slot = self.handle.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        *slot = Some(handle);
        tracing::info!("⏰ Poller de lembretes iniciado (a cada {}s)", every.as_secs());
        true
    }

    /// `false` se não estava rodando.
    pub fn stop(&self) -> bool {
        if !self.running.swap(false, Ordering::SeqCst) {
            return false;
        }
        let mut slot = self.handle.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        if let Some(handle) = slot.take() {
            handle.abort();
        }
        tracing::info!("Poller de lembretes parado");
        true
    }
}

impl Drop for ReminderPoller {
    fn drop(&mut self) {
        self.stop();
    }
}
