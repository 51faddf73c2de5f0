//! Secondary index maintenance.
//!
//! Three indices are derived from payload cross-references at upsert time:
//!
//! - `grant:<grantId>`: list of primary keys issued under a grant. It only
//!   grows; members are removed by deleting the whole list on revocation.
//!   Its expiry is only ever extended, never shortened, so the list outlives
//!   its longest-lived member. A member that never expires makes the list
//!   persistent.
//! - `userCode:<code>`: pointer to one primary key, expiring with it.
//! - `uid:<uid>`: pointer to one primary key, expiring with it.
//!
//! Index writes are staged into the same [`Batch`] as the primary record.
//! The grant append uses [`Command::RPushExtend`](crate::Command::RPushExtend),
//! so reading the current TTL, pushing and extending run as one atomic step
//! on the store instead of a client-side read followed by a write.

use tracing::debug;

use crate::entity::CrossReferences;
use crate::keyspace;
use crate::kind::KindTraits;
use crate::store::Batch;

/// Stages secondary index writes for an upserted record.
#[derive(Debug, Clone, Copy, Default)]
pub struct IndexWriter {
    max_grant_entries: Option<usize>,
}

impl IndexWriter {
    pub fn new(max_grant_entries: Option<usize>) -> Self {
        Self { max_grant_entries }
    }

    /// Appends the index commands for `primary_key` to `batch`.
    ///
    /// `expires_in` is the record's own lifetime; `None` or zero leaves the
    /// indices without an expiry update.
    pub fn stage(
        &self,
        batch: &mut Batch,
        primary_key: &str,
        traits: KindTraits,
        refs: &CrossReferences<'_>,
        expires_in: Option<u64>,
    ) {
        let expires_in = expires_in.filter(|secs| *secs > 0);

        if traits.grantable {
            if let Some(grant_id) = refs.grant_id {
                self.stage_grant(batch, primary_key, grant_id, expires_in);
            }
        }

        if let Some(user_code) = refs.user_code {
            let key = keyspace::user_code_key(user_code);
            stage_pointer(batch, key, primary_key, expires_in);
            debug!(
                primary_key = %primary_key,
                user_code_prefix = %user_code.chars().take(4).collect::<String>(),
                "Staged user code index"
            );
        }

        if let Some(uid) = refs.uid {
            stage_pointer(batch, keyspace::uid_key(uid), primary_key, expires_in);
            debug!(primary_key = %primary_key, uid = %uid, "Staged session index");
        }
    }

    fn stage_grant(
        &self,
        batch: &mut Batch,
        primary_key: &str,
        grant_id: &str,
        expires_in: Option<u64>,
    ) {
        let grant_key = keyspace::grant_key(grant_id);
        batch.rpush_extend(grant_key.clone(), primary_key, expires_in);

        if let Some(max) = self.max_grant_entries.filter(|max| *max > 0) {
            batch.ltrim(grant_key, -(max as i64), -1);
        }

        debug!(primary_key = %primary_key, grant_id = %grant_id, "Staged grant index");
    }
}

fn stage_pointer(batch: &mut Batch, key: String, primary_key: &str, expires_in: Option<u64>) {
    batch.set(key.clone(), primary_key);
    if let Some(secs) = expires_in {
        batch.expire(key, secs);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::Command;
    use serde_json::json;

    fn staged(
        writer: IndexWriter,
        traits: KindTraits,
        payload: serde_json::Value,
        expires_in: Option<u64>,
    ) -> Vec<Command> {
        let mut batch = Batch::new();
        let refs = CrossReferences::extract(&payload);
        writer.stage(&mut batch, "AccessToken:t1", traits, &refs, expires_in);
        batch.into_commands()
    }

    #[test]
    fn test_grant_index_appends_and_extends() {
        let commands = staged(
            IndexWriter::default(),
            KindTraits::GRANTABLE,
            json!({ "grantId": "g1" }),
            Some(3600),
        );
        assert_eq!(
            commands,
            vec![
                Command::RPushExtend {
                    key: "grant:g1".into(),
                    value: "AccessToken:t1".into(),
                    seconds: Some(3600)
                },
            ]
        );
    }

    #[test]
    fn test_non_grantable_kind_skips_grant_index() {
        let commands = staged(
            IndexWriter::default(),
            KindTraits::PLAIN,
            json!({ "grantId": "g1" }),
            Some(3600),
        );
        assert!(commands.is_empty());
    }

    #[test]
    fn test_grant_index_cap_trims_oldest() {
        let commands = staged(
            IndexWriter::new(Some(100)),
            KindTraits::GRANTABLE,
            json!({ "grantId": "g1" }),
            None,
        );
        assert_eq!(
            commands[1],
            Command::LTrim {
                key: "grant:g1".into(),
                start: -100,
                stop: -1
            }
        );
        assert_eq!(commands.len(), 2);
    }

    #[test]
    fn test_pointers_follow_record_expiry() {
        let commands = staged(
            IndexWriter::default(),
            KindTraits::PLAIN,
            json!({ "userCode": "ABCD-EFGH", "uid": "s1" }),
            Some(600),
        );
        assert_eq!(
            commands,
            vec![
                Command::Set {
                    key: "userCode:ABCD-EFGH".into(),
                    value: "AccessToken:t1".into()
                },
                Command::Expire {
                    key: "userCode:ABCD-EFGH".into(),
                    seconds: 600
                },
                Command::Set {
                    key: "uid:s1".into(),
                    value: "AccessToken:t1".into()
                },
                Command::Expire {
                    key: "uid:s1".into(),
                    seconds: 600
                },
            ]
        );
    }

    #[test]
    fn test_zero_expiry_sets_no_ttl() {
        let commands = staged(
            IndexWriter::default(),
            KindTraits::GRANTABLE,
            json!({ "grantId": "g1", "uid": "s1" }),
            Some(0),
        );
        assert!(!commands.iter().any(|c| matches!(c, Command::Expire { .. })));
        assert_eq!(
            commands[0],
            Command::RPushExtend {
                key: "grant:g1".into(),
                value: "AccessToken:t1".into(),
                seconds: None
            }
        );
    }
}
