use std::sync::Arc;

use lectern_collab::{
    random_string, Classroom, Database, DiskMediaStore, MemoryDatabase, NewSession, NewUser,
};
use lectern_server::{run_server, Gateway, ServerContext};
use log::info;

mod logging;

#[tokio::main]
async fn main() {
    logging::init_logger();

    let classroom = Arc::new(Classroom::new(MemoryDatabase::new()));
    let gateway = Gateway::new();
    let media = Arc::new(DiskMediaStore::new("data/media", "/media"));

    seed_dev_instructor(&classroom).await;

    info!("Starting lectern...");

    run_server(ServerContext {
        classroom,
        gateway,
        media,
    })
    .await;
}

/// The in-memory database starts empty, so create an instructor account with a
/// session token to poke the API with.
async fn seed_dev_instructor(classroom: &Classroom) {
    let db = classroom.database();

    let user = db
        .create_user(NewUser {
            username: "instructor".to_string(),
            display_name: "Demo Instructor".to_string(),
            avatar: None,
        })
        .await
        .expect("seed user is created");

    let token = random_string(32);

    db.create_session(NewSession {
        token: token.clone(),
        user_id: user.id,
    })
    .await
    .expect("seed session is created");

    info!("Dev instructor ready, bearer token: {}", token);
}
