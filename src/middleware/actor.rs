// src/middleware/actor.rs

use std::convert::Infallible;

use axum::{extract::FromRequestParts, http::request::Parts};

// O proxy de autenticação repassa o nome de quem está agindo neste cabeçalho
const USER_NAME_HEADER: &str = "x-user-name";

/// Nome de exibição do usuário atual, quando o proxy informa.
/// Nunca rejeita a requisição: sem cabeçalho (ou com valor ilegível) vira `None`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Actor(pub Option<String>);

impl<S> FromRequestParts<S> for Actor
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let name = parts
            .headers
            .get(USER_NAME_HEADER)
            .and_then(|value| value.to_str().ok())
            .map(str::trim)
            .filter(|name| !name.is_empty())
            .map(str::to_string);
        Ok(Actor(name))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::Request;

    async fn extract(header: Option<&str>) -> Actor {
        let mut builder = Request::builder().uri("/");
        if let Some(value) = header {
            builder = builder.header(USER_NAME_HEADER, value);
        }
        let (mut parts, _) = builder.body(()).unwrap().into_parts();
        Actor::from_request_parts(&mut parts, &()).await.unwrap()
    }

    #[tokio::test]
    async fn reads_trimmed_user_name() {
        assert_eq!(extract(Some("  Ana López ")).await, Actor(Some("Ana López".into())));
        assert_eq!(extract(Some("   ")).await, Actor(None));
        assert_eq!(extract(None).await, Actor(None));
    }
}
