//! Order history persisted as a pretty-printed JSON array.

use std::fs;
use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use crate::domain::error::CrossbotError;
use crate::domain::order::Order;
use crate::ports::order_store_port::OrderStore;

pub struct JsonOrderStore {
    path: PathBuf,
    orders: Vec<Order>,
}

impl JsonOrderStore {
    /// Open an existing history, or start an empty one if the file is absent.
    /// An unreadable history is logged and replaced with an empty one.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, CrossbotError> {
        let path = path.as_ref().to_path_buf();
        ensure_parent(&path)?;

        let orders = if path.exists() {
            let content = fs::read_to_string(&path)?;
            if content.trim().is_empty() {
                Vec::new()
            } else {
                match serde_json::from_str::<Vec<Order>>(&content) {
                    Ok(orders) => orders,
                    Err(e) => {
                        warn!(
                            path = %path.display(),
                            error = %e,
                            "order history unreadable, starting empty"
                        );
                        Vec::new()
                    }
                }
            }
        } else {
            Vec::new()
        };

        let store = Self { path, orders };
        store.flush()?;
        debug!(
            path = %store.path.display(),
            orders = store.orders.len(),
            "order store opened"
        );
        Ok(store)
    }

    /// Start a fresh history, discarding whatever the file held.
    pub fn create<P: AsRef<Path>>(path: P) -> Result<Self, CrossbotError> {
        let path = path.as_ref().to_path_buf();
        ensure_parent(&path)?;
        let store = Self {
            path,
            orders: Vec::new(),
        };
        store.flush()?;
        Ok(store)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn flush(&self) -> Result<(), CrossbotError> {
        let json = serde_json::to_string_pretty(&self.orders)?;
        fs::write(&self.path, json).map_err(|e| CrossbotError::Persistence {
            reason: format!("failed to write {}: {e}", self.path.display()),
        })
    }
}

fn ensure_parent(path: &Path) -> Result<(), CrossbotError> {
    match path.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => {
            fs::create_dir_all(dir).map_err(|e| CrossbotError::Persistence {
                reason: format!("failed to create {}: {e}", dir.display()),
            })
        }
        _ => Ok(()),
    }
}

impl OrderStore for JsonOrderStore {
    fn save_order(&mut self, order: &Order) -> Result<(), CrossbotError> {
        self.orders.push(order.clone());
        if let Err(e) = self.flush() {
            self.orders.pop();
            return Err(e);
        }
        Ok(())
    }

    fn all_orders(&self) -> Result<Vec<Order>, CrossbotError> {
        Ok(self.orders.clone())
    }

    fn last_order(&self) -> Result<Option<Order>, CrossbotError> {
        Ok(self.orders.last().cloned())
    }
}
