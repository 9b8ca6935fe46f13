use serde::Serialize;

/// Request body of `POST /analyze/`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct AnalyzeRequest<'a> {
    pub url: &'a str,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn body_shape() {
        let body = serde_json::to_value(AnalyzeRequest {
            url: "https://www.instagram.com/p/XYZ/",
        })
        .unwrap();
        assert_eq!(body, serde_json::json!({ "url": "https://www.instagram.com/p/XYZ/" }));
    }
}
