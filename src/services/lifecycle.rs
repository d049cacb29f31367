// src/services/lifecycle.rs
//
// Regras puras da máquina de etapas da ordem. Nada aqui toca no banco:
// o OrderService carrega a ordem, aplica a transição e persiste tudo na
// mesma transação.

use chrono::{DateTime, NaiveDate, Utc};

use crate::{
    common::error::AppError,
    models::orders::{Order, OrderLineDetail, OrderStage, OrderStatus},
};

// --- Trabalhadores ---

/// Converte o texto livre em um conjunto ordenado de nomes.
/// Separadores: vírgula, ponto e vírgula ou quebra de linha.
/// Nomes repetidos (sem diferenciar maiúsculas) ficam só na primeira ocorrência.
pub fn parse_workers(text: &str) -> Vec<String> {
    let mut workers: Vec<String> = Vec::new();
    for name in text.split([',', ';', '\n']).map(str::trim).filter(|n| !n.is_empty()) {
        let lowered = name.to_lowercase();
        if !workers.iter().any(|w| w.to_lowercase() == lowered) {
            workers.push(name.to_string());
        }
    }
    workers
}

/// Etapa, status e indicador de confirmação de uma ordem recém-criada.
pub fn initial_placement(workers: &[String]) -> (OrderStage, OrderStatus, bool) {
    if workers.is_empty() {
        (OrderStage::Creada, OrderStatus::Pending, false)
    } else {
        (OrderStage::Asignada, OrderStatus::InProgress, true)
    }
}

// --- Transições ---

/// Sobrescreve a lista. Lista vazia devolve a ordem para CREADA;
/// o indicador permanente de confirmação e o estado de recojo não mudam.
pub fn assign_workers(order: &mut Order, workers: Vec<String>) {
    order.assigned_workers = workers;
    if order.assigned_workers.is_empty() {
        order.stage = OrderStage::Creada;
    }
}

/// Devolve `true` na primeira confirmação de toda a vida da ordem.
pub fn confirm_assignment(order: &mut Order) -> Result<bool, AppError> {
    if order.assigned_workers.is_empty() {
        return Err(AppError::PreconditionFailed(
            "Atribua ao menos um trabalhador antes de confirmar".into(),
        ));
    }

    let first_time = !order.ever_assignment_confirmed;
    order.stage = OrderStage::Asignada;
    order.ever_assignment_confirmed = true;
    order.review_finalized = false;
    Ok(first_time)
}

/// Marca o recojo. Devolve `true` se a ordem nunca tinha sido marcada antes.
pub fn mark_picked_up(order: &mut Order, today: NaiveDate) -> bool {
    let first_time = !order.ever_marked_picked_up;
    order.picked_up = true;
    order.picked_up_on = Some(today);
    order.stage = OrderStage::Recogido;
    order.ever_marked_picked_up = true;
    order.review_finalized = false;
    if order.status == OrderStatus::Pending {
        order.status = OrderStatus::InProgress;
    }
    first_time
}

/// Desfaz o recojo. Os extintores sem série são apagados por quem chama.
pub fn unmark_picked_up(order: &mut Order) {
    order.picked_up = false;
    order.picked_up_on = None;
    order.stage = OrderStage::Asignada;
}

/// Envia para revisão do escritório. Devolve `true` no primeiro envio.
pub fn send_to_review(order: &mut Order, now: DateTime<Utc>, recharge_date: Option<String>) -> bool {
    let first_time = !order.sent_to_office;
    order.stage = OrderStage::Revision;
    order.worker_completed_at = Some(now);
    if first_time {
        order.sent_to_office = true;
        order.sent_to_office_at = Some(now);
    }
    if let Some(date) = recharge_date.filter(|d| !d.trim().is_empty()) {
        order.selected_recharge_date = Some(date);
    }
    order.review_finalized = false;
    first_time
}

pub fn finalize_review(order: &mut Order, now: DateTime<Utc>) {
    order.stage = OrderStage::Finalizado;
    order.office_reviewed_at = Some(now);
    order.status = OrderStatus::Completed;
    order.review_finalized = true;
}

/// Status grosso depois de uma mudança na planilha de extintores.
pub fn registration_status(current: OrderStatus, requested: i32, filled: usize) -> OrderStatus {
    let requested = requested.max(0) as usize;
    if filled >= requested {
        OrderStatus::Completed
    } else if filled > 0 {
        OrderStatus::InProgress
    } else {
        current
    }
}

// --- Geração de extintores pendentes ---

/// Quantos extintores gerar para cada detalhe, na ordem dos detalhes,
/// parando quando o total da ordem chega a `requested`.
pub fn plan_placeholders(existing: usize, requested: i32, details: &[OrderLineDetail]) -> Vec<(i64, usize)> {
    let mut remaining = (requested.max(0) as usize).saturating_sub(existing);
    let mut plan = Vec::new();
    for detail in details {
        if remaining == 0 {
            break;
        }
        let count = (detail.quantity.max(0) as usize).min(remaining);
        if count > 0 {
            plan.push((detail.id, count));
            remaining -= count;
        }
    }
    plan
}
