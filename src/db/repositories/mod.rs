mod profiles;
mod replies;
mod stories;
mod views;
