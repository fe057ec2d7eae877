#[actix_web::main]
async fn main() -> std::io::Result<()> {
    contract_generator_server::run().await
}
