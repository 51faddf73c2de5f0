//! Cascading revocation by grant.

use tracing::{info, instrument};

use crate::AdapterResult;
use crate::adapter::TokenAdapter;
use crate::keyspace;
use crate::store::Batch;

impl TokenAdapter {
    /// Deletes every record issued under a grant, then the grant index.
    ///
    /// A missing or empty grant index is a no-op. User code and session
    /// pointers to the deleted records are not touched; they resolve to
    /// not-found and expire on their own.
    #[instrument(skip(self))]
    pub async fn revoke_by_grant_id(&self, grant_id: &str) -> AdapterResult<()> {
        let store = self.store()?;
        let grant_key = keyspace::grant_key(grant_id);
        let members = store.lrange_all(&grant_key).await?;

        let mut batch = Batch::new();
        for member in &members {
            batch.del(member.as_str());
        }
        batch.del(grant_key);
        store.execute(batch).await?;

        info!(grant_id = %grant_id, revoked = members.len(), "Revoked grant");
        Ok(())
    }
}
