//! The client-side command runtime (SPEC_FULL.md §4.7): one async function
//! per wire action, each allocating a fresh request id through
//! [`crate::connection::Connection`], awaiting the correlated reply via the
//! waitlist, and applying the command's local side effect (storing a
//! server/identity record, decrypting a challenge, recording a message).

use std::sync::Arc;

use chrono::{DateTime, TimeZone, Utc};
use hush_protocol::{Action, ErrorCode, HookId, Packet};
use rsa::RsaPrivateKey;
use tokio::sync::Mutex;

use crate::connection::Connection;
use crate::error::ClientError;
use crate::store::{ClientStore, LocalIdentity, StoredMessage};

struct ActiveIdentity {
    username: String,
    private_key: RsaPrivateKey,
}

/// An unsolicited server push, decoded and (for `Message`) decrypted
/// (SPEC_FULL.md §4.7 "Unsolicited streams").
#[derive(Debug, Clone)]
pub enum ClientEvent {
    Message {
        sender: String,
        sent_at: DateTime<Utc>,
        plaintext: String,
    },
    Hook {
        hook: HookId,
        subject: String,
        detail: String,
    },
    Shutdown {
        at: DateTime<Utc>,
    },
}

/// One function per wire action over a live [`Connection`], backed by a
/// [`ClientStore`] for everything that must survive the process.
pub struct Client {
    connection: Connection,
    store: Arc<dyn ClientStore>,
    server_name: String,
    identity: Mutex<Option<ActiveIdentity>>,
}

impl Client {
    pub fn new(connection: Connection, store: Arc<dyn ClientStore>, server_name: impl Into<String>) -> Self {
        Self {
            connection,
            store,
            server_name: server_name.into(),
            identity: Mutex::new(None),
        }
    }

    pub fn server_name(&self) -> &str {
        &self.server_name
    }

    /// `true` once [`Client::login`] has bound a decrypted private key in memory.
    pub async fn is_logged_in(&self) -> bool {
        self.identity.lock().await.is_some()
    }

    async fn active_username(&self) -> Result<String, ClientError> {
        self.identity
            .lock()
            .await
            .as_ref()
            .map(|identity| identity.username.clone())
            .ok_or(ClientError::NotLoggedIn)
    }

    /// Generates a fresh RSA-4096 keypair and stores it, private half
    /// encrypted at rest under `passphrase` (SPEC_FULL.md §4.4, §6).
    pub async fn generate_identity(&self, username: &str, passphrase: &[u8]) -> Result<(), ClientError> {
        generate_identity(self.store.as_ref(), username, passphrase).await
    }

    /// `REG(username, pubkey_pem)`, using a keypair previously created by
    /// [`Client::generate_identity`].
    pub async fn register(&self, username: &str) -> Result<(), ClientError> {
        let identity = self
            .store
            .find_identity(username)
            .await?
            .ok_or_else(|| ClientError::NoIdentity(username.to_owned()))?;

        self.connection
            .request(
                Action::Reg,
                0,
                vec![username.as_bytes().to_vec(), identity.public_key_pem.into_bytes()],
                &[Action::Ok],
            )
            .await?;
        Ok(())
    }

    /// The full LOGIN/VERIF handshake, including the TLS-only reusable-token
    /// fast path and the post-login catch-up trigger (SPEC_FULL.md §4.5, §4.7).
    pub async fn login(&self, username: &str, passphrase: &[u8]) -> Result<(), ClientError> {
        let identity = self
            .store
            .find_identity(username)
            .await?
            .ok_or_else(|| ClientError::NoIdentity(username.to_owned()))?;

        let private_key_pem = hush_crypto::decrypt_data(passphrase, &identity.encrypted_private_key)
            .map_err(|_| ClientError::WrongPassphrase)?;
        let private_key_pem = String::from_utf8(private_key_pem).map_err(|_| ClientError::WrongPassphrase)?;
        let private_key = hush_crypto::private_key_from_pem(&private_key_pem)?;

        let mut args = vec![username.as_bytes().to_vec()];
        if let Some(token) = self.store.take_reusable_token(&self.server_name, username).await? {
            args.push(token);
        }

        let reply = self
            .connection
            .request(Action::Login, 0, args, &[Action::Verif, Action::Ok])
            .await?;

        let reply = match reply.action {
            Action::Ok => reply,
            Action::Verif => {
                let ciphertext = reply.args.first().ok_or(ClientError::Handshake)?;
                let plaintext = hush_crypto::decrypt(&private_key, ciphertext).map_err(|_| ClientError::Handshake)?;
                self.connection
                    .request(
                        Action::Verif,
                        0,
                        vec![username.as_bytes().to_vec(), plaintext],
                        &[Action::Ok],
                    )
                    .await?
            }
            other => return Err(ClientError::UnexpectedReply(other)),
        };

        if let Some(new_token) = reply.args.first() {
            self.store
                .save_reusable_token(&self.server_name, username, new_token)
                .await?;
        }

        *self.identity.lock().await = Some(ActiveIdentity {
            username: username.to_owned(),
            private_key,
        });

        // Reconciles anything the automatic post-VERIF push missed; an
        // already-empty cache is expected, not an error (§4.7 "Catch-up on
        // login").
        match self.reciv().await {
            Ok(()) | Err(ClientError::Server(ErrorCode::Empty)) => Ok(()),
            Err(other) => Err(other),
        }
    }

    pub async fn logout(&self) -> Result<(), ClientError> {
        let username = self.active_username().await?;
        self.connection.request(Action::Logout, 0, vec![], &[Action::Ok]).await?;
        self.store.clear_reusable_token(&self.server_name, &username).await?;
        *self.identity.lock().await = None;
        Ok(())
    }

    pub async fn deregister(&self) -> Result<(), ClientError> {
        let username = self.active_username().await?;
        self.connection.request(Action::Dereg, 0, vec![], &[Action::Ok]).await?;
        self.store.clear_reusable_token(&self.server_name, &username).await?;
        *self.identity.lock().await = None;
        Ok(())
    }

    /// `REQ(username)`, caching the returned key under [`ClientStore::save_known_user`].
    pub async fn request_public_key(&self, username: &str) -> Result<String, ClientError> {
        let reply = self
            .connection
            .request(Action::Req, 0, vec![username.as_bytes().to_vec()], &[Action::Req])
            .await?;
        let pem_bytes = reply.args.get(1).ok_or(ClientError::UnexpectedReply(Action::Req))?;
        let pem = String::from_utf8(pem_bytes.clone()).map_err(|_| ClientError::UnexpectedReply(Action::Req))?;
        self.store.save_known_user(&self.server_name, username, &pem).await?;
        Ok(pem)
    }

    /// `USRS(filter)`. `online_only`/`with_permission` are the two filter
    /// bits this implementation assigns (see `hush-server`'s `handlers::directory`).
    pub async fn list_users(&self, online_only: bool, with_permission: bool) -> Result<Vec<String>, ClientError> {
        let filter = (online_only as u8) | ((with_permission as u8) << 1);
        let reply = self
            .connection
            .request(Action::Usrs, filter, vec![vec![filter]], &[Action::Usrs])
            .await?;
        let body = reply.args.first().cloned().unwrap_or_default();
        Ok(String::from_utf8_lossy(&body)
            .lines()
            .map(str::to_owned)
            .collect())
    }

    /// Encrypts `plaintext` under the recipient's cached (or freshly
    /// requested) public key and sends `MSG(dest, stamp, ciphertext)`.
    pub async fn send_message(&self, dest: &str, plaintext: &str) -> Result<(), ClientError> {
        let pubkey_pem = match self.store.find_known_user(&self.server_name, dest).await? {
            Some(pem) => pem,
            None => self.request_public_key(dest).await?,
        };
        let public_key = hush_crypto::public_key_from_pem(&pubkey_pem)?;
        let ciphertext = hush_crypto::encrypt(&public_key, plaintext.as_bytes())?;
        let sent_at = Utc::now();

        self.connection
            .request(
                Action::Msg,
                0,
                vec![dest.as_bytes().to_vec(), encode_timestamp(sent_at), ciphertext],
                &[Action::Ok],
            )
            .await?;

        self.store
            .record_message(&StoredMessage {
                server: self.server_name.clone(),
                peer: dest.to_owned(),
                incoming: false,
                sent_at,
                plaintext: plaintext.to_owned(),
            })
            .await?;
        Ok(())
    }

    /// Explicitly triggers catch-up delivery of any cached messages. An
    /// empty cache surfaces as `ErrorCode::Empty`, not a crash (§4.6 "RECIV").
    pub async fn reciv(&self) -> Result<(), ClientError> {
        self.connection.request(Action::Reciv, 0, vec![], &[Action::Ok]).await?;
        Ok(())
    }

    pub async fn subscribe_hook(&self, hook: HookId) -> Result<(), ClientError> {
        self.connection
            .request(Action::Sub, 0, vec![vec![hook.code()]], &[Action::Ok])
            .await?;
        Ok(())
    }

    pub async fn unsubscribe_hook(&self, hook: HookId) -> Result<(), ClientError> {
        self.connection
            .request(Action::Unsub, 0, vec![vec![hook.code()]], &[Action::Ok])
            .await?;
        Ok(())
    }

    /// Fire-and-forget liveness ping; no reply is expected (§4.6 "KEEP").
    pub async fn keep_alive(&self) -> Result<(), ClientError> {
        self.connection.send_fire_and_forget(Action::Keep, 0, vec![]).await
    }

    pub async fn admin_shutdown(&self, at: DateTime<Utc>) -> Result<(), ClientError> {
        self.admin(vec![b"shutdown".to_vec(), encode_timestamp(at)]).await
    }

    pub async fn admin_broadcast(&self, message: &str) -> Result<(), ClientError> {
        self.admin(vec![b"broadcast".to_vec(), message.as_bytes().to_vec()])
            .await
    }

    pub async fn admin_deregister(&self, username: &str) -> Result<(), ClientError> {
        self.admin(vec![b"deregister".to_vec(), username.as_bytes().to_vec()])
            .await
    }

    pub async fn admin_promote(&self, username: &str) -> Result<(), ClientError> {
        self.admin(vec![b"promote".to_vec(), username.as_bytes().to_vec()])
            .await
    }

    pub async fn admin_kick(&self, username: &str) -> Result<(), ClientError> {
        self.admin(vec![b"kick".to_vec(), username.as_bytes().to_vec()]).await
    }

    pub async fn admin_set(&self, path: &str, value: &str) -> Result<(), ClientError> {
        self.admin(vec![
            b"set".to_vec(),
            path.as_bytes().to_vec(),
            value.as_bytes().to_vec(),
        ])
        .await
    }

    async fn admin(&self, args: Vec<Vec<u8>>) -> Result<(), ClientError> {
        self.connection.request(Action::Admin, 0, args, &[Action::Ok]).await?;
        Ok(())
    }

    /// Pops the next unsolicited RECIV/HOOK/SHTDWN push, decoding (and, for
    /// a message, decrypting and recording) it. `None` once the connection
    /// has closed and no more events are queued (§4.7 "Unsolicited streams").
    pub async fn next_event(&self) -> Option<ClientEvent> {
        loop {
            let packet = self.connection.next_event().await?;
            match packet.action {
                Action::Reciv => {
                    if let Some(event) = self.decode_message_push(packet).await {
                        return Some(event);
                    }
                }
                Action::Hook => {
                    if let Some(event) = decode_hook_push(&packet) {
                        return Some(event);
                    }
                }
                Action::Shtdwn => {
                    if let Some(event) = decode_shutdown_push(&packet) {
                        return Some(event);
                    }
                }
                _ => {}
            }
        }
    }

    async fn decode_message_push(&self, packet: Packet) -> Option<ClientEvent> {
        let [sender, stamp, ciphertext]: [Vec<u8>; 3] = packet.args.try_into().ok()?;
        let sender = String::from_utf8_lossy(&sender).into_owned();
        let sent_at = decode_timestamp(&stamp)?;

        let plaintext = {
            let identity = self.identity.lock().await;
            let private_key = &identity.as_ref()?.private_key;
            hush_crypto::decrypt(private_key, &ciphertext).ok()?
        };
        let plaintext = String::from_utf8_lossy(&plaintext).into_owned();

        let _ = self
            .store
            .record_message(&StoredMessage {
                server: self.server_name.clone(),
                peer: sender.clone(),
                incoming: true,
                sent_at,
                plaintext: plaintext.clone(),
            })
            .await;

        Some(ClientEvent::Message {
            sender,
            sent_at,
            plaintext,
        })
    }

    pub async fn close(&self) {
        self.connection.close().await;
    }
}

/// Generates a fresh RSA-4096 keypair and stores it under `username`,
/// private half encrypted at rest under `passphrase` (SPEC_FULL.md §4.4,
/// §6). Free function so the `keygen` CLI subcommand can run it without an
/// open connection; [`Client::generate_identity`] delegates here.
pub async fn generate_identity(store: &dyn ClientStore, username: &str, passphrase: &[u8]) -> Result<(), ClientError> {
    let (private_key, public_key) = hush_crypto::generate_keypair()?;
    let public_key_pem = hush_crypto::public_key_to_pem(&public_key)?;
    let private_key_pem = hush_crypto::private_key_to_pem(&private_key)?;
    let encrypted_private_key = hush_crypto::encrypt_data(passphrase, private_key_pem.as_bytes())?;

    store
        .save_identity(&LocalIdentity {
            username: username.to_owned(),
            public_key_pem,
            encrypted_private_key,
        })
        .await?;
    Ok(())
}

fn decode_hook_push(packet: &Packet) -> Option<ClientEvent> {
    let hook = HookId::try_from(packet.info).ok()?;
    let subject = packet.args.first().map(|b| String::from_utf8_lossy(b).into_owned())?;
    let detail = packet
        .args
        .get(1)
        .map(|b| String::from_utf8_lossy(b).into_owned())
        .unwrap_or_default();
    Some(ClientEvent::Hook { hook, subject, detail })
}

fn decode_shutdown_push(packet: &Packet) -> Option<ClientEvent> {
    let stamp = packet.args.first()?;
    let at = decode_timestamp(stamp)?;
    Some(ClientEvent::Shutdown { at })
}

fn encode_timestamp(at: DateTime<Utc>) -> Vec<u8> {
    at.timestamp().to_be_bytes().to_vec()
}

fn decode_timestamp(bytes: &[u8]) -> Option<DateTime<Utc>> {
    let raw: [u8; 8] = bytes.try_into().ok()?;
    Utc.timestamp_opt(i64::from_be_bytes(raw), 0).single()
}
