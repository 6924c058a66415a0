mod canonical;
mod ids;
