//! In-memory mock stores.
//!
//! These stand in for the real database the marketplace will eventually
//! grow; state is process-local and lost on restart.  Keeping them behind
//! `AppState` means swapping in a persistent backend later touches nothing
//! but this module.

use serde::Serialize;
use std::sync::Arc;
use tokio::sync::RwLock;
use uuid::Uuid;

use shared::types::claims::Role;

// ---------------------------------------------------------------------------
// Admin directory
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize)]
pub struct AdminUser {
    pub id: String,
    pub email: String,
    pub name: String,
    pub role: Role,
    pub permissions: Vec<String>,
    #[serde(skip_serializing)]
    password: String,
}

/// Read-only seeded admin accounts.  Demo credentials in plaintext — this
/// mirrors the seed data of the system this replaces and must be swapped
/// for hashed credentials before any real deployment.
#[derive(Clone, Debug)]
pub struct AdminDirectory {
    users: Arc<Vec<AdminUser>>,
}

impl AdminDirectory {
    pub fn seeded() -> Self {
        let users = vec![
            AdminUser {
                id: "admin-1".to_string(),
                email: "admin@si-umkm.com".to_string(),
                name: "Admin Si-UMKM".to_string(),
                role: Role::Admin,
                permissions: vec![
                    "read:products".to_string(),
                    "write:products".to_string(),
                    "read:users".to_string(),
                    "read:programs".to_string(),
                    "write:programs".to_string(),
                ],
                password: "admin123".to_string(),
            },
            AdminUser {
                id: "super-admin-1".to_string(),
                email: "superadmin@si-umkm.com".to_string(),
                name: "Super Admin Si-UMKM".to_string(),
                role: Role::SuperAdmin,
                permissions: vec!["*".to_string()],
                password: "admin123".to_string(),
            },
        ];

        Self {
            users: Arc::new(users),
        }
    }

    /// Credential check; returns the matching account without its password
    /// field ever serializing.
    pub fn authenticate(&self, email: &str, password: &str) -> Option<AdminUser> {
        self.users
            .iter()
            .find(|user| user.email == email && user.password == password)
            .cloned()
    }

    pub fn find(&self, id: &str) -> Option<AdminUser> {
        self.users.iter().find(|user| user.id == id).cloned()
    }
}

// ---------------------------------------------------------------------------
// Product store
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize)]
pub struct Product {
    pub id: String,
    pub name: String,
    pub description: String,
    pub price: f64,
    pub website: String,
    pub phone: String,
    pub contact_email: String,
    pub tags: Vec<String>,
}

#[derive(Clone, Debug, Default)]
pub struct ProductStore {
    inner: Arc<RwLock<Vec<Product>>>,
}

impl ProductStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert with a server-assigned id; returns the stored product.
    pub async fn create(&self, mut product: Product) -> Product {
        product.id = Uuid::new_v4().to_string();
        let mut products = self.inner.write().await;
        products.push(product.clone());
        product
    }

    pub async fn list(&self) -> Vec<Product> {
        self.inner.read().await.clone()
    }

    pub async fn len(&self) -> usize {
        self.inner.read().await.len()
    }
}
