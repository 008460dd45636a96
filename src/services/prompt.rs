//! 申诉提示词
//!
//! 申诉文本提交给巴西平台，因此提示词和输出都使用葡萄牙语

use crate::error::CompositionError;
use crate::models::OrderCandidate;

/// 平台允许的申诉文本最大长度（字符）
pub const MAX_CONTESTATION_CHARS: usize = 2000;

pub const SYSTEM_MESSAGE: &str = "Você é um especialista em atendimento ao vendedor de marketplace. \
Sua tarefa é redigir contestações de pedidos de reembolso de forma educada, objetiva e \
fundamentada nos fatos do pedido. Nunca invente fatos que não estejam nos dados fornecidos.";

/// 构建用户消息
pub fn build_user_message(order: &OrderCandidate) -> String {
    let dispute = &order.dispute;

    let requested_at = dispute
        .requested_at
        .map(|ts| ts.format("%d/%m/%Y %H:%M").to_string())
        .unwrap_or_else(|| "não informado".to_string());

    let buyer_message = dispute
        .buyer_message
        .as_deref()
        .filter(|m| !m.trim().is_empty())
        .unwrap_or("nenhuma");

    format!(
        r#"Redija uma contestação para o pedido de reembolso abaixo.

Pedido: {order_id}
Motivo alegado pelo comprador: {reason}
Valor solicitado: {amount:.2} {currency}
Data da solicitação: {requested_at}
Mensagem do comprador: {buyer_message}

Regras:
- Escreva em português do Brasil, em no máximo {max} caracteres.
- Responda ao motivo alegado de forma específica.
- Não use markdown, títulos ou listas.
- Retorne somente o texto da contestação."#,
        order_id = order.order_id,
        reason = dispute.reason,
        amount = dispute.amount,
        currency = dispute.currency,
        requested_at = requested_at,
        buyer_message = buyer_message,
        max = MAX_CONTESTATION_CHARS,
    )
}

/// 清理模型输出：去掉代码块和引号包裹，超长截断，空文本视为失败
pub fn finish_contestation(raw: &str) -> Result<String, CompositionError> {
    let mut text = raw.trim();

    if let Some(inner) = text.strip_prefix("```") {
        // 去掉可能存在的语言标记行
        let inner = inner.split_once('\n').map_or(inner, |(_, rest)| rest);
        text = inner.strip_suffix("```").unwrap_or(inner).trim();
    }

    let text = text.trim_matches('"').trim();

    if text.is_empty() {
        return Err(CompositionError::new("模型返回内容为空"));
    }

    Ok(text.chars().take(MAX_CONTESTATION_CHARS).collect())
}
