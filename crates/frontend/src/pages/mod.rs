pub mod recommender;
