use url::Url;

use super::request::{TransactionRequest, FINGERPRINT_VERSION};
use crate::config::GatewayConfig;

pub const FORM_ID: &str = "vinti4-payment";

/// Gateway endpoint the form posts to. The gateway expects the fingerprint and
/// timestamp repeated in the query string.
pub fn form_action(config: &GatewayConfig, request: &TransactionRequest) -> Url {
    let mut action = config.gateway_url().clone();
    action
        .query_pairs_mut()
        .append_pair("FingerPrint", request.fingerprint())
        .append_pair("TimeStamp", request.timestamp())
        .append_pair("FingerPrintVersion", FINGERPRINT_VERSION);
    action
}

/// Self-submitting HTML page carrying every request field as a hidden input.
pub fn render_auto_submit_form(config: &GatewayConfig, request: &TransactionRequest) -> String {
    let inputs: String = request
        .form_fields()
        .iter()
        .map(|(name, value)| {
            format!(
                "      <input type=\"hidden\" name=\"{}\" value=\"{}\">\n",
                escape_html_attr(name),
                escape_html_attr(value)
            )
        })
        .collect();

    format!(
        concat!(
            "<!DOCTYPE html>\n",
            "<html>\n",
            "  <head><meta charset=\"utf-8\"><title>Pagamento</title></head>\n",
            "  <body onload=\"document.getElementById('{id}').submit()\">\n",
            "    <form id=\"{id}\" action=\"{action}\" method=\"post\">\n",
            "{inputs}",
            "      <noscript><button type=\"submit\">Continuar</button></noscript>\n",
            "    </form>\n",
            "  </body>\n",
            "</html>\n"
        ),
        id = FORM_ID,
        action = escape_html_attr(form_action(config, request).as_str()),
        inputs = inputs,
    )
}

fn escape_html_attr(input: &str) -> String {
    input
        .replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&#x27;")
        .replace('\n', "&#10;")
        .replace('\r', "&#13;")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vinti4::request::{CardholderInfo, RequestBuilder, TransactionCode};
    use bigdecimal::BigDecimal;

    fn request(config: &GatewayConfig) -> TransactionRequest {
        RequestBuilder::new(config, TransactionCode::Purchase, BigDecimal::from(1500))
            .cardholder(CardholderInfo {
                bill_addr_line1: Some("Rua \"A\" & <B>".into()),
                ..Default::default()
            })
            .build()
            .unwrap()
    }

    #[test]
    fn action_carries_fingerprint_query() {
        let config = GatewayConfig::for_tests("123456789A");
        let request = request(&config);
        let action = form_action(&config, &request);

        let pairs: Vec<(String, String)> = action.query_pairs().into_owned().collect();
        assert_eq!(action.path(), "/BizMPIOnUs/CardPayment");
        assert!(pairs.contains(&("FingerPrint".to_string(), request.fingerprint().to_string())));
        assert!(pairs.contains(&("TimeStamp".to_string(), request.timestamp().to_string())));
        assert!(pairs.contains(&("FingerPrintVersion".to_string(), "1".to_string())));
    }

    #[test]
    fn renders_hidden_inputs_and_escapes_values() {
        let config = GatewayConfig::for_tests("123456789A");
        let request = request(&config);
        let html = render_auto_submit_form(&config, &request);

        assert!(html.contains("method=\"post\""));
        assert!(html.contains(&format!(
            "name=\"merchantRef\" value=\"{}\"",
            request.merchant_ref()
        )));
        assert!(html.contains("value=\"Rua &quot;A&quot; &amp; &lt;B&gt;\""));
        assert!(!html.contains("value=\"\""));
        assert_eq!(
            html.matches("<input").count(),
            request.form_fields().len()
        );
    }
}
