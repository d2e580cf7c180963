use sipforge::prelude::*;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), SipforgeError> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    // PORT from the environment for hosted deploys, 3000 otherwise.
    let port = std::env::var("PORT").unwrap_or_else(|_| "3000".into());
    let addr = format!("0.0.0.0:{port}");

    let server = PartyServerBuilder::new().bind(&addr).build().await?;
    tracing::info!(%addr, "party server ready");
    server.run().await
}

#[cfg(test)]
mod tests {
    //! End-to-end game flows over real WebSockets: join, submit, rounds,
    //! votes, reveal, and the end of the party.

    use super::*;
    use futures_util::{SinkExt, StreamExt};
    use serde_json::{Value, json};
    use std::time::Duration;
    use tokio_tungstenite::tungstenite::Message;

    type Ws = tokio_tungstenite::WebSocketStream<
        tokio_tungstenite::MaybeTlsStream<tokio::net::TcpStream>,
    >;

    async fn start() -> String {
        let server = PartyServerBuilder::new()
            .bind("127.0.0.1:0")
            .build()
            .await
            .unwrap();
        let addr = server.local_addr().unwrap().to_string();
        tokio::spawn(async move {
            let _ = server.run().await;
        });
        tokio::time::sleep(Duration::from_millis(10)).await;
        addr
    }

    async fn ws(addr: &str) -> Ws {
        let (ws, _) = tokio_tungstenite::connect_async(format!("ws://{addr}"))
            .await
            .unwrap();
        ws
    }

    async fn send(ws: &mut Ws, msg: Value) {
        ws.send(Message::Text(msg.to_string().into())).await.unwrap();
    }

    async fn recv(ws: &mut Ws) -> Value {
        let msg = tokio::time::timeout(Duration::from_secs(5), ws.next())
            .await
            .expect("timeout")
            .unwrap()
            .unwrap();
        serde_json::from_slice(&msg.into_data()).unwrap()
    }

    async fn assert_silent(ws: &mut Ws) {
        let result = tokio::time::timeout(Duration::from_millis(100), ws.next()).await;
        assert!(result.is_err(), "expected silence, got {result:?}");
    }

    fn post(author: &str, difficulty: u8) -> Value {
        json!({
            "uri": format!("https://cdn.example/{author}.jpg"),
            "type": "image",
            "difficulty": difficulty,
            "author": author,
        })
    }

    /// Setup: Alice and Bob joined into "AB12CD", roster updates drained.
    async fn lobby(addr: &str) -> (Ws, Ws) {
        let mut alice = ws(addr).await;
        let mut bob = ws(addr).await;
        send(
            &mut alice,
            json!({ "type": "join_room", "code": "AB12CD", "pseudo": "Alice", "avatar": "a1" }),
        )
        .await;
        let _ = recv(&mut alice).await;
        send(
            &mut bob,
            json!({ "type": "join_room", "code": "AB12CD", "pseudo": "Bob", "avatar": null }),
        )
        .await;
        let _ = recv(&mut bob).await;
        let _ = recv(&mut alice).await;
        (alice, bob)
    }

    /// Finds a player entry in a roster payload.
    fn player<'a>(players: &'a Value, pseudo: &str) -> &'a Value {
        players
            .as_array()
            .unwrap()
            .iter()
            .find(|p| p["pseudo"] == pseudo)
            .unwrap_or_else(|| panic!("{pseudo} missing from {players}"))
    }

    // -----------------------------------------------------------------
    // One full party: submit, round, votes, reveal, next round, end.
    // -----------------------------------------------------------------
    #[tokio::test]
    async fn test_full_party_flow() {
        let addr = start().await;
        let (mut alice, mut bob) = lobby(&addr).await;

        // Alice submits her post; the host starts the game.
        send(
            &mut alice,
            json!({ "type": "submit_posts", "code": "AB12CD", "posts": [post("Alice", 2)] }),
        )
        .await;
        send(&mut alice, json!({ "type": "start_game", "code": "AB12CD" })).await;

        for ws in [&mut alice, &mut bob] {
            let started = recv(ws).await;
            assert_eq!(started["type"], "game_started");
            let round = recv(ws).await;
            assert_eq!(round["type"], "current_round");
            assert_eq!(round["roundNumber"], 1);
            assert_eq!(round["media"]["author"], "Alice");
            assert_eq!(round["media"]["difficulty"], 2);
        }

        // Bob guesses right, Alice guesses wrong.
        send(
            &mut bob,
            json!({ "type": "vote", "code": "AB12CD", "from": "Bob", "target": "Alice" }),
        )
        .await;
        let confirmed = recv(&mut bob).await;
        assert_eq!(confirmed["type"], "vote_confirmed");
        assert_eq!(confirmed["target"], "Alice");

        send(
            &mut alice,
            json!({ "type": "vote", "code": "AB12CD", "from": "Alice", "target": "Bob" }),
        )
        .await;
        let _ = recv(&mut alice).await;

        // Bob tries to vote again — first vote wins, silently.
        send(
            &mut bob,
            json!({ "type": "vote", "code": "AB12CD", "from": "Bob", "target": "Bob" }),
        )
        .await;
        assert_silent(&mut bob).await;

        // Reveal: scored results in vote order, stats updated.
        send(&mut alice, json!({ "type": "reveal_votes", "code": "AB12CD" })).await;
        for ws in [&mut alice, &mut bob] {
            let reveal = recv(ws).await;
            assert_eq!(reveal["type"], "votes_revealed");
            assert_eq!(reveal["author"]["pseudo"], "Alice");
            assert_eq!(reveal["difficulty"], 2);
            assert_eq!(reveal["hasMoreMedia"], false);

            let results = reveal["results"].as_array().unwrap();
            assert_eq!(results.len(), 2);
            assert_eq!(results[0]["name"], "Bob");
            assert_eq!(results[0]["choice"], "Alice");
            assert_eq!(results[0]["correct"], true);
            assert_eq!(results[0]["action"], "distributes 2 drink(s)");
            assert_eq!(results[1]["name"], "Alice");
            assert_eq!(results[1]["correct"], false);
            assert_eq!(results[1]["action"], "drinks 2 drink(s)");

            let bob_stats = player(&reveal["players"], "Bob");
            assert_eq!(bob_stats["timesCorrect"], 1);
            assert_eq!(bob_stats["drinksGiven"], 2);
            assert_eq!(bob_stats["timesTargeted"], 1);
            let alice_stats = player(&reveal["players"], "Alice");
            assert_eq!(alice_stats["timesWrong"], 1);
            assert_eq!(alice_stats["drinksTaken"], 2);
        }

        // Bob adds one more post; the next round draws it.
        send(
            &mut bob,
            json!({ "type": "add_media", "code": "AB12CD", "media": post("Bob", 1) }),
        )
        .await;
        send(&mut bob, json!({ "type": "next_round", "code": "AB12CD" })).await;
        for ws in [&mut alice, &mut bob] {
            let _ = recv(ws).await; // game_started
            let round = recv(ws).await;
            assert_eq!(round["roundNumber"], 2);
            assert_eq!(round["media"]["author"], "Bob");
        }

        // Queue is dry now: advancing fails, and only the caller hears it.
        send(&mut bob, json!({ "type": "next_round", "code": "AB12CD" })).await;
        let err = recv(&mut bob).await;
        assert_eq!(err["type"], "error");
        assert_silent(&mut alice).await;

        // End of the party: stats on request, end_game for everyone.
        send(&mut alice, json!({ "type": "get_end_stats", "code": "AB12CD" })).await;
        let stats = recv(&mut alice).await;
        assert_eq!(stats["type"], "end_stats");
        assert_eq!(player(&stats["players"], "Bob")["timesCorrect"], 1);

        send(&mut alice, json!({ "type": "go_to_end", "code": "AB12CD" })).await;
        assert_eq!(recv(&mut alice).await["type"], "end_game");
        assert_eq!(recv(&mut bob).await["type"], "end_game");
    }

    // -----------------------------------------------------------------
    // Denunciation: the accused gets a tip-off, nobody else hears it,
    // and the counter shows up in the roster.
    // -----------------------------------------------------------------
    #[tokio::test]
    async fn test_denounce_notifies_the_accused() {
        let addr = start().await;
        let (mut alice, mut bob) = lobby(&addr).await;

        send(
            &mut bob,
            json!({ "type": "denounce", "code": "AB12CD", "from": "Bob", "target": "Alice" }),
        )
        .await;

        let tip = recv(&mut alice).await;
        assert_eq!(tip["type"], "denounced");
        assert_eq!(tip["from"], "Bob");
        assert_silent(&mut bob).await;

        send(&mut bob, json!({ "type": "get_players", "code": "AB12CD" })).await;
        let roster = recv(&mut bob).await;
        assert_eq!(roster["type"], "players_list");
        assert_eq!(player(&roster["players"], "Alice")["timesDenounced"], 1);
    }

    // -----------------------------------------------------------------
    // Reconnecting clients resync the round in progress.
    // -----------------------------------------------------------------
    #[tokio::test]
    async fn test_get_current_round_resyncs() {
        let addr = start().await;
        let (mut alice, mut bob) = lobby(&addr).await;

        send(
            &mut alice,
            json!({ "type": "submit_posts", "code": "AB12CD", "posts": [post("Alice", 1)] }),
        )
        .await;
        send(&mut alice, json!({ "type": "start_game", "code": "AB12CD" })).await;
        for ws in [&mut alice, &mut bob] {
            let _ = recv(ws).await;
            let _ = recv(ws).await;
        }

        // Bob's app re-entered the round screen and asks again.
        send(&mut bob, json!({ "type": "get_current_round", "code": "AB12CD" })).await;
        let round = recv(&mut bob).await;
        assert_eq!(round["type"], "current_round");
        assert_eq!(round["roundNumber"], 1);
        assert_silent(&mut alice).await;
    }

    // -----------------------------------------------------------------
    // Departures: survivors get the shrunken roster; the room dies with
    // its last player.
    // -----------------------------------------------------------------
    #[tokio::test]
    async fn test_departures_shrink_then_destroy_the_room() {
        let addr = start().await;
        let (alice, mut bob) = lobby(&addr).await;

        drop(alice); // Alice's app is killed mid-party

        let update = recv(&mut bob).await;
        assert_eq!(update["type"], "room_update");
        let players = update["players"].as_array().unwrap();
        assert_eq!(players.len(), 1);
        assert_eq!(players[0]["pseudo"], "Bob");

        // Bob leaves too; the code is free again for a brand-new party.
        bob.close(None).await.unwrap();
        tokio::time::sleep(Duration::from_millis(50)).await;

        let mut late = ws(&addr).await;
        send(
            &mut late,
            json!({ "type": "join_room", "code": "AB12CD", "pseudo": "Alice", "avatar": null }),
        )
        .await;
        let update = recv(&mut late).await;
        assert_eq!(update["type"], "room_update");
        assert_eq!(update["players"].as_array().unwrap().len(), 1);
    }
}
