use super::HttpClientError;
use crate::prelude::*;
use crate::{err, Result};
use async_trait::async_trait;
use easy_ext::ext;
use reqwest_middleware::RequestBuilder;
use serde::{de::DeserializeOwned, Serialize};

#[ext(RequestBuilderJsonExt)]
#[async_trait]
pub(crate) impl RequestBuilder {
    /// Sends `body` as JSON and decodes the JSON reply
    async fn send_and_read_json<Req, Res>(self, body: &Req) -> Result<Res>
    where
        Req: Serialize + Sync + ?Sized,
        Res: DeserializeOwned,
    {
        self.json(body).read_json().await
    }

    async fn read_json<Res: DeserializeOwned>(self) -> Result<Res> {
        let body = self.read_text().await?;
        decode_json(&body)
    }
}

/// Paste hosts and lockers sometimes reply with an HTML page and `200 OK`,
/// so the body is kept in the error.
pub(crate) fn decode_json<T: DeserializeOwned>(body: &str) -> Result<T> {
    serde_json::from_str(body).map_err(|source| {
        let expected = std::any::type_name::<T>();

        warn!(response_body = %body, expected, "Bad JSON response");

        err!(HttpClientError::UnexpectedResponseJsonShape {
            expected,
            body: body.to_owned(),
            source,
        })
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, Deserialize, PartialEq)]
    struct Reply {
        id: String,
    }

    #[test]
    fn decode_json_keeps_the_body() {
        assert_eq!(
            decode_json::<Reply>(r#"{"id": "p1"}"#).unwrap(),
            Reply { id: "p1".to_owned() }
        );

        let err = decode_json::<Reply>("<html>Bad gateway</html>").unwrap_err();
        let message = err.to_string();

        assert!(message.contains("<html>Bad gateway</html>"), "{message}");
        assert!(message.contains("Reply"), "{message}");
    }
}
