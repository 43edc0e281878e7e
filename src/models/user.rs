// src/models/user.rs

use serde::{Deserialize, Serialize};

// Usuário da equipe. O cadastro vive no provedor de login; aqui só lemos
// quem quer receber notificações por e-mail.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    #[serde(default)]
    pub nombre: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub activo: bool,
    #[serde(default)]
    pub notificaciones_email: bool,
}
