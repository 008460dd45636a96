use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// 平台返回的候选订单
///
/// 在一个周期内不可变，周期结束即丢弃
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderCandidate {
    pub order_id: String,
    pub dispute: DisputeDetails,
}

/// 退款纠纷信息，生成申诉文本所需的全部上下文
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DisputeDetails {
    /// 买家填写的退款原因
    pub reason: String,
    /// 退款金额
    pub amount: f64,
    #[serde(default = "default_currency")]
    pub currency: String,
    /// 买家发起退款的时间
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub requested_at: Option<DateTime<Utc>>,
    /// 订单最后修改时间
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
    /// 买家补充说明
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub buyer_message: Option<String>,
}

fn default_currency() -> String {
    "BRL".to_string()
}

impl OrderCandidate {
    pub fn new(order_id: impl Into<String>, dispute: DisputeDetails) -> Self {
        Self {
            order_id: order_id.into(),
            dispute,
        }
    }
}

/// 一页订单查询结果
///
/// `next_page_token` 为空表示已经取完
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderPage {
    #[serde(default)]
    pub orders: Vec<OrderCandidate>,
    #[serde(default)]
    pub next_page_token: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_page_deserializes_platform_payload() {
        let payload = r#"{
            "orders": [
                {
                    "orderId": "A-100",
                    "dispute": {
                        "reason": "produto não chegou",
                        "amount": 129.9,
                        "requestedAt": "2026-10-18T12:00:00Z"
                    }
                }
            ],
            "nextPageToken": "p2"
        }"#;

        let page: OrderPage = serde_json::from_str(payload).unwrap();
        assert_eq!(page.orders.len(), 1);
        assert_eq!(page.orders[0].order_id, "A-100");
        assert_eq!(page.orders[0].dispute.currency, "BRL");
        assert!(page.orders[0].dispute.buyer_message.is_none());
        assert_eq!(page.next_page_token.as_deref(), Some("p2"));
    }

    #[test]
    fn test_last_page_has_no_token() {
        let page: OrderPage = serde_json::from_str(r#"{"orders": []}"#).unwrap();
        assert!(page.orders.is_empty());
        assert!(page.next_page_token.is_none());
    }
}
