//! Scenario 6 (SPEC_FULL.md §8): a VERIF reply carrying the wrong plaintext
//! must fail the handshake with `ERR(Handshake)`, purge the pending
//! verification, and leave no session bound — checked here at the raw
//! `Connection` level rather than through `Client::login`, since the
//! high-level runtime always sends back the correctly decrypted challenge.

use hush_client::{ClientStore, Connection, SqliteClientStore};
use hush_protocol::{Action, ErrorCode};
use hush_tests::spawn_server;

#[tokio::test]
async fn wrong_verif_plaintext_fails_the_handshake_without_binding_a_session() {
    let (addr, services) = spawn_server().await.expect("server starts");

    let store = SqliteClientStore::open_in_memory().expect("in-memory identity store");
    hush_client::generate_identity(&store, "alice", b"alice-pass")
        .await
        .expect("generates a local identity");
    let identity = store
        .find_identity("alice")
        .await
        .expect("reads the identity back")
        .expect("identity was just stored");

    let (connection, _motd) = Connection::connect_plain(&addr).await.expect("connects");
    connection
        .request(
            Action::Reg,
            0,
            vec![b"alice".to_vec(), identity.public_key_pem.into_bytes()],
            &[Action::Ok],
        )
        .await
        .expect("registers alice");

    let verif = connection
        .request(Action::Login, 0, vec![b"alice".to_vec()], &[Action::Verif])
        .await
        .expect("server issues a challenge");
    assert_eq!(verif.action, Action::Verif, "LOGIN for a known, offline user issues VERIF");

    let error = connection
        .request(
            Action::Verif,
            0,
            vec![b"alice".to_vec(), b"definitely-not-the-real-plaintext".to_vec()],
            &[Action::Ok],
        )
        .await
        .expect_err("a wrong plaintext must fail the handshake");
    match error {
        hush_client::ClientError::Server(code) => assert_eq!(code, ErrorCode::Handshake),
        other => panic!("expected ErrorCode::Handshake, got {other:?}"),
    }

    // No session was bound: alice isn't in the online-sessions table, so a
    // fresh, correct LOGIN attempt from a second connection still goes
    // through the full challenge/response path rather than hitting
    // duplicate-session (`ErrorCode::Login`).
    assert!(services.state.session_by_username("alice").await.is_none());

    connection.close().await;
}
